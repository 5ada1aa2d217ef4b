//! JSON framing for [`Message`].

use thiserror::Error;

use crate::types::Message;

/// Errors raised while framing messages.
#[derive(Debug, Error)]
pub enum ProtoError {
	/// The payload is not a valid message.
	#[error("invalid message payload: {0}")]
	Json(#[from] serde_json::Error),
}

/// Serializes a message for the broadcast channel.
pub fn encode(message: &Message) -> Result<String, ProtoError> {
	Ok(serde_json::to_string(message)?)
}

/// Parses a message received from the broadcast channel.
pub fn decode(payload: &str) -> Result<Message, ProtoError> {
	Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::types::{CodeMessage, ReplicaId, WireOp, WireOperation};

	#[test]
	fn code_message_json_shape() {
		let message = Message::Code(CodeMessage {
			project: Some("site".to_string()),
			path: "index.html".to_string(),
			base: 3,
			version: 4,
			ops: WireOperation(vec![
				WireOp::Retain(5),
				WireOp::Insert("!".to_string()),
				WireOp::Delete(1),
			]),
			full_text: Some("hello!".to_string()),
			author: ReplicaId::master(),
			clock: BTreeMap::from([(ReplicaId::master(), 4)]),
		});

		let json: serde_json::Value = serde_json::from_str(&encode(&message).unwrap()).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"type": "code",
				"project": "site",
				"path": "index.html",
				"base": 3,
				"version": 4,
				"ops": [{"retain": 5}, {"insert": "!"}, {"delete": 1}],
				"fullText": "hello!",
				"author": "master",
				"clock": {"master": 4},
			})
		);
	}

	#[test]
	fn decode_without_optional_fields() {
		let payload = r#"{"type":"code","path":"a.css","base":0,"version":1,"ops":[{"insert":"x"}],"author":"peer"}"#;
		let Message::Code(msg) = decode(payload).unwrap() else {
			panic!("expected code message");
		};
		assert_eq!(msg.project, None);
		assert_eq!(msg.full_text, None);
		assert!(msg.clock.is_empty());
		assert_eq!(msg.author, ReplicaId::from("peer"));
	}

	#[test]
	fn decode_leave_and_cursor() {
		let leave = decode(r#"{"type":"leave","author":"p1"}"#).unwrap();
		assert_eq!(leave.author().as_str(), "p1");
		assert_eq!(leave.path(), None);

		let cursor =
			decode(r#"{"type":"cursor","path":"a","author":"p1","cursorStart":1,"cursorEnd":3}"#)
				.unwrap();
		assert_eq!(cursor.path(), Some("a"));
	}

	#[test]
	fn decode_rejects_garbage() {
		assert!(matches!(decode("{\"type\":\"nope\"}"), Err(ProtoError::Json(_))));
	}

	#[test]
	fn generated_ids_are_unique_peers() {
		let a = ReplicaId::generate();
		let b = ReplicaId::generate();
		assert_ne!(a, b);
		assert!(!a.is_master());
		assert!(ReplicaId::master().is_master());
	}
}
