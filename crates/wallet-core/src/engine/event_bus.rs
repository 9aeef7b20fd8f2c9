//! Broadcast channel carrying store events to the watcher and any other
//! subscriber.

use tokio::sync::broadcast;
use wallet_types::TransactionEvent;

/// Multi-consumer event bus backed by a tokio broadcast channel.
///
/// Cloning the bus shares the underlying channel. Subscribers that fall
/// behind by more than `capacity` events observe a lag error and skip ahead.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TransactionEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a receiver that sees every event published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<TransactionEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, failing only when nobody is subscribed.
	pub fn publish(
		&self,
		event: TransactionEvent,
	) -> Result<usize, broadcast::error::SendError<TransactionEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
