//! Control messages from the companion wearable.
//!
//! A message is a small dictionary keyed by integers plus a transaction id.
//! Key [`CODE_KEY`] carries the command code. Every message that arrives is
//! acknowledged with its transaction id once it has been processed, whether
//! or not the code was understood.

use std::collections::BTreeMap;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::channel::StatePublisher;
use crate::fsm::Transition;

/// Dictionary key holding the command code.
pub const CODE_KEY: u32 = 0;

pub const CODE_RED: i64 = 1;
pub const CODE_BLINKING: i64 = 2;
pub const CODE_GREEN: i64 = 3;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TupleValue {
    Int(i64),
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControlMessage {
    pub transaction_id: u32,
    #[serde(default)]
    pub data: BTreeMap<u32, TupleValue>,
}

impl ControlMessage {
    pub fn with_code(transaction_id: u32, code: i64) -> Self {
        let mut data = BTreeMap::new();
        data.insert(CODE_KEY, TupleValue::Int(code));
        Self {
            transaction_id,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WirelessDecodeError {
    #[error("message has no command code under key {CODE_KEY}")]
    MissingCode,
    #[error("command code is not an integer: {0}")]
    NotAnInteger(String),
    #[error("unrecognised command code {0}")]
    UnknownCode(i64),
    #[error("malformed control message: {0}")]
    Malformed(String),
}

/// Reads the command code out of a message.
pub fn decode_command(message: &ControlMessage) -> Result<Transition, WirelessDecodeError> {
    let value = message
        .data
        .get(&CODE_KEY)
        .ok_or(WirelessDecodeError::MissingCode)?;
    let code = match value {
        TupleValue::Int(code) => *code,
        TupleValue::Text(text) => return Err(WirelessDecodeError::NotAnInteger(text.clone())),
        TupleValue::Other(other) => {
            return Err(WirelessDecodeError::NotAnInteger(other.to_string()))
        }
    };
    match code {
        CODE_RED => Ok(Transition::SetRed),
        CODE_BLINKING => Ok(Transition::SetBlinking),
        CODE_GREEN => Ok(Transition::SetGreen),
        other => Err(WirelessDecodeError::UnknownCode(other)),
    }
}

/// Parses one newline-delimited JSON control message.
pub fn parse_line(line: &str) -> Result<ControlMessage, WirelessDecodeError> {
    serde_json::from_str(line.trim()).map_err(|err| WirelessDecodeError::Malformed(err.to_string()))
}

/// Acknowledgment returned to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(rename = "ack")]
    pub transaction_id: u32,
}

/// Destination for acknowledgments.
pub trait AckSink {
    fn acknowledge(&self, ack: Acknowledgement);
}

impl AckSink for Sender<Acknowledgement> {
    fn acknowledge(&self, ack: Acknowledgement) {
        if self.send(ack).is_err() {
            tracing::warn!(
                transaction_id = ack.transaction_id,
                "acknowledgment receiver is gone; dropping ack"
            );
        }
    }
}

/// Bridges received control messages into the state channel.
#[derive(Debug)]
pub struct WirelessAdapter<S> {
    publisher: StatePublisher,
    sink: S,
    received: u64,
}

impl<S: AckSink> WirelessAdapter<S> {
    pub fn new(publisher: StatePublisher, sink: S) -> Self {
        Self {
            publisher,
            sink,
            received: 0,
        }
    }

    /// Number of messages handled so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Decodes, publishes and acknowledges one message.
    ///
    /// Decode failures are logged and leave the lamp untouched; the message
    /// is still acknowledged.
    pub fn handle(&mut self, message: &ControlMessage) -> Result<Transition, WirelessDecodeError> {
        self.received += 1;
        let result = decode_command(message);
        match &result {
            Ok(transition) => {
                tracing::debug!(
                    transaction_id = message.transaction_id,
                    ?transition,
                    "control message received"
                );
                self.publisher.publish(*transition);
            }
            Err(err) => {
                tracing::warn!(
                    transaction_id = message.transaction_id,
                    error = %err,
                    "ignoring control message"
                );
            }
        }
        self.sink.acknowledge(Acknowledgement {
            transaction_id: message.transaction_id,
        });
        result
    }

    /// Handles one line of the JSON transport.
    ///
    /// Lines that do not parse carry no usable transaction id and are not
    /// acknowledged.
    pub fn handle_line(&mut self, line: &str) -> Result<Transition, WirelessDecodeError> {
        let message = parse_line(line).inspect_err(|err| {
            tracing::warn!(error = %err, "dropping unreadable control line");
        })?;
        self.handle(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StateChannel;
    use crate::fsm::{LampState, TrafficLight};
    use crossbeam_channel::unbounded;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        acks: RefCell<Vec<u32>>,
    }

    impl AckSink for &RecordingSink {
        fn acknowledge(&self, ack: Acknowledgement) {
            self.acks.borrow_mut().push(ack.transaction_id);
        }
    }

    #[test]
    fn decodes_known_codes() {
        assert_eq!(
            decode_command(&ControlMessage::with_code(1, 1)),
            Ok(Transition::SetRed)
        );
        assert_eq!(
            decode_command(&ControlMessage::with_code(1, 2)),
            Ok(Transition::SetBlinking)
        );
        assert_eq!(
            decode_command(&ControlMessage::with_code(1, 3)),
            Ok(Transition::SetGreen)
        );
    }

    #[test]
    fn rejects_unknown_and_missing_codes() {
        assert_eq!(
            decode_command(&ControlMessage::with_code(1, 9)),
            Err(WirelessDecodeError::UnknownCode(9))
        );
        let empty = ControlMessage {
            transaction_id: 4,
            data: BTreeMap::new(),
        };
        assert_eq!(decode_command(&empty), Err(WirelessDecodeError::MissingCode));
    }

    #[test]
    fn parses_json_lines() {
        let message = parse_line(r#"{"transaction_id": 7, "data": {"0": 2}}"#).expect("parse");
        assert_eq!(message, ControlMessage::with_code(7, 2));

        let text = parse_line(r#"{"transaction_id": 8, "data": {"0": "green"}}"#).unwrap();
        assert!(matches!(
            decode_command(&text),
            Err(WirelessDecodeError::NotAnInteger(_))
        ));

        let float = parse_line(r#"{"transaction_id": 9, "data": {"0": 2.5}}"#).unwrap();
        assert!(matches!(
            decode_command(&float),
            Err(WirelessDecodeError::NotAnInteger(_))
        ));

        assert!(matches!(
            parse_line("not json"),
            Err(WirelessDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn blinking_code_while_green_transitions_and_acks() {
        let (publisher, consumer) = StateChannel::new();
        let sink = RecordingSink::default();
        let mut adapter = WirelessAdapter::new(publisher, &sink);
        let mut light = TrafficLight::new();
        light.apply(Transition::SetGreen, 0);

        let result = adapter.handle(&ControlMessage::with_code(42, CODE_BLINKING));
        assert_eq!(result, Ok(Transition::SetBlinking));

        let pending = consumer.consume_if_any().expect("published transition");
        light.apply(pending, 10);
        assert_eq!(light.state(), LampState::Blinking);
        assert_eq!(*sink.acks.borrow(), vec![42]);
    }

    #[test]
    fn undecodable_message_is_acked_but_not_published() {
        let (publisher, consumer) = StateChannel::new();
        let sink = RecordingSink::default();
        let mut adapter = WirelessAdapter::new(publisher, &sink);

        assert!(adapter.handle(&ControlMessage::with_code(5, 0)).is_err());
        assert_eq!(consumer.consume_if_any(), None);
        assert_eq!(*sink.acks.borrow(), vec![5]);
        assert_eq!(adapter.received(), 1);
    }

    #[test]
    fn unreadable_line_is_not_acked() {
        let (publisher, _consumer) = StateChannel::new();
        let sink = RecordingSink::default();
        let mut adapter = WirelessAdapter::new(publisher, &sink);
        assert!(adapter.handle_line("{").is_err());
        assert!(sink.acks.borrow().is_empty());
    }

    #[test]
    fn crossbeam_sender_is_an_ack_sink() {
        let (publisher, _consumer) = StateChannel::new();
        let (ack_tx, ack_rx) = unbounded();
        let mut adapter = WirelessAdapter::new(publisher, ack_tx);
        adapter
            .handle_line(r#"{"transaction_id": 3, "data": {"0": 1}}"#)
            .expect("decode");
        assert_eq!(
            ack_rx.try_recv().ok(),
            Some(Acknowledgement { transaction_id: 3 })
        );
    }

    #[test]
    fn acknowledgement_serialises_as_ack_field() {
        let json = serde_json::to_string(&Acknowledgement { transaction_id: 11 }).unwrap();
        assert_eq!(json, r#"{"ack":11}"#);
    }
}
