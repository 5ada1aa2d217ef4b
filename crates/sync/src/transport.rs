//! Outbound message channel.
//!
//! The real transport (a presence/broadcast service) lives outside this crate.
//! Bindings only need fire-and-forget broadcast; inbound messages are pushed
//! by the host into [`SyncManager::handle_message`](crate::SyncManager::handle_message).
//! The host must also deliver a sender's own messages back to it: that echo
//! is the acknowledgment signal.

use std::collections::VecDeque;

use quill_proto::{Message, ReplicaId};
use rustc_hash::FxHashMap;

/// Fire-and-forget broadcast to every replica subscribed to a document.
pub trait Transport {
	/// Broadcasts `message`, including back to the sender.
	fn send(&mut self, message: Message);
}

/// Collects outbound messages, for hosts that drive I/O themselves.
impl Transport for Vec<Message> {
	fn send(&mut self, message: Message) {
		self.push(message);
	}
}

impl<T: Transport + ?Sized> Transport for &mut T {
	fn send(&mut self, message: Message) {
		(**self).send(message);
	}
}

/// In-process broadcast bus.
///
/// Each subscriber has one FIFO queue per sender, so a sender's messages stay
/// in order while messages from different senders can be delivered in any
/// interleaving the caller chooses.
#[derive(Debug, Default)]
pub struct MemoryBus {
	subscribers: Vec<ReplicaId>,
	/// Receiver -> sender -> queued messages.
	queues: FxHashMap<ReplicaId, FxHashMap<ReplicaId, VecDeque<Message>>>,
}

impl MemoryBus {
	/// Creates an empty bus.
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes a replica; it receives every message sent afterwards.
	pub fn subscribe(&mut self, replica: ReplicaId) {
		if !self.subscribers.contains(&replica) {
			self.queues.entry(replica.clone()).or_default();
			self.subscribers.push(replica);
		}
	}

	/// Removes a replica and drops everything queued for it.
	pub fn unsubscribe(&mut self, replica: &ReplicaId) {
		self.subscribers.retain(|r| r != replica);
		self.queues.remove(replica);
	}

	/// Returns the subscribed replicas in subscription order.
	pub fn subscribers(&self) -> &[ReplicaId] {
		&self.subscribers
	}

	/// Returns `(receiver, sender)` pairs that have queued messages, in a stable order.
	pub fn ready(&self) -> Vec<(ReplicaId, ReplicaId)> {
		let mut ready = Vec::new();
		for receiver in &self.subscribers {
			let Some(by_sender) = self.queues.get(receiver) else {
				continue;
			};
			for sender in &self.subscribers {
				if by_sender.get(sender).is_some_and(|q| !q.is_empty()) {
					ready.push((receiver.clone(), sender.clone()));
				}
			}
		}
		ready
	}

	/// Pops the oldest message `sender` has queued for `receiver`.
	pub fn deliver(&mut self, receiver: &ReplicaId, sender: &ReplicaId) -> Option<Message> {
		self.queues.get_mut(receiver)?.get_mut(sender)?.pop_front()
	}

	/// Pops the oldest message queued for `receiver` from any sender.
	///
	/// Senders are visited in subscription order.
	pub fn deliver_any(&mut self, receiver: &ReplicaId) -> Option<Message> {
		let by_sender = self.queues.get_mut(receiver)?;
		self.subscribers
			.iter()
			.find_map(|sender| by_sender.get_mut(sender)?.pop_front())
	}

	/// Drops the oldest message `sender` has queued for `receiver`.
	pub fn drop_next(&mut self, receiver: &ReplicaId, sender: &ReplicaId) -> bool {
		self.deliver(receiver, sender).is_some()
	}

	/// Number of messages still queued for anyone.
	pub fn in_flight(&self) -> usize {
		self.queues
			.values()
			.flat_map(|by_sender| by_sender.values())
			.map(VecDeque::len)
			.sum()
	}
}

impl Transport for MemoryBus {
	fn send(&mut self, message: Message) {
		let sender = message.author().clone();
		for receiver in &self.subscribers {
			self.queues
				.entry(receiver.clone())
				.or_default()
				.entry(sender.clone())
				.or_default()
				.push_back(message.clone());
		}
	}
}
