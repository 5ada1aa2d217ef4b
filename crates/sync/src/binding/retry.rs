//! Retransmission of unacknowledged sends and release of throttled cursors.

use std::time::Instant;

use quill_proto::Message;

use super::{DocumentBinding, SyncStatus};
use crate::transport::Transport;

impl DocumentBinding {
	/// Drives time-based work: retransmits the in-flight send once its ack
	/// timeout has passed and broadcasts a throttled local cursor once due.
	///
	/// Retransmissions reuse the original message, so receivers that already
	/// absorbed it drop the copy by version. After `max_retries` attempts the
	/// binding stops retransmitting and reports [`SyncStatus::Stalled`] until
	/// the echo arrives.
	pub fn poll(&mut self, now: Instant, transport: &mut dyn Transport) -> SyncStatus {
		if let Some((start, end)) = self.presence.take_due(now) {
			self.send_cursor(start, end, transport);
		}

		if self.stalled {
			return SyncStatus::Stalled;
		}

		let max_retries = self.config.max_retries;
		let Some(entry) = self.outstanding.first_mut() else {
			return self.status();
		};

		let delay = self.config.retry_delay(entry.attempts);
		if now.saturating_duration_since(entry.sent_at) < delay {
			return self.status();
		}

		if entry.attempts >= max_retries {
			let version = entry.version;
			self.stalled = true;
			tracing::warn!(
				path = %self.path,
				version,
				attempts = max_retries,
				"no acknowledgment after retransmissions, document stalled"
			);
			return SyncStatus::Stalled;
		}

		entry.attempts += 1;
		entry.sent_at = now;
		tracing::debug!(
			path = %self.path,
			version = entry.version,
			attempt = entry.attempts,
			"retransmitting unacknowledged operation"
		);
		transport.send(Message::Code(entry.message.clone()));
		self.status()
	}
}
