//! Inbound message decoding.
//!
//! [`Decoder::decode`] takes the raw bytes received on one topic and returns
//! the flat parameter map. Sources are tried in order: the binary envelope
//! first, then a JSON body for topics that may carry one. Each step is
//! logged; a body nothing understands yields an empty [`Decoded`].

use std::fmt;

use log::{debug, error, trace};

use crate::config::DecoderConfig;
use crate::envelope::{Envelope, SubMessage};
use crate::error::{Result, WireError};
use crate::flatten;
use crate::protocol::{self, CommandId};
use crate::value::{FieldMap, Node, Record, Value};

/// Bytes of payload shown in trace lines.
const TRACE_BYTES: usize = 32;

/// Which transport topic a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Periodic property push from the device.
    Status,
    /// Our own set command, echoed back.
    SetEcho,
    SetReply,
    GetEcho,
    GetReply,
}

impl Topic {
    /// Classify a full topic name by its trailing segments.
    pub fn from_topic_suffix(topic: &str) -> Option<Self> {
        const SUFFIXES: [(&str, Topic); 5] = [
            ("/thing/property/set_reply", Topic::SetReply),
            ("/thing/property/get_reply", Topic::GetReply),
            ("/thing/property/post", Topic::Status),
            ("/thing/property/set", Topic::SetEcho),
            ("/thing/property/get", Topic::GetEcho),
        ];
        SUFFIXES
            .iter()
            .find(|(suffix, _)| topic.ends_with(suffix))
            .map(|(_, t)| *t)
    }

    /// Whether the device itself publishes on this topic.
    pub fn is_device_originated(&self) -> bool {
        matches!(self, Topic::Status | Topic::SetReply | Topic::GetReply)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Status => "status",
            Topic::SetEcho => "set",
            Topic::SetReply => "set_reply",
            Topic::GetEcho => "get",
            Topic::GetReply => "get_reply",
        };
        f.write_str(name)
    }
}

/// Where the decoded values came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Source {
    Envelope,
    Json,
    /// Nothing could be decoded.
    #[default]
    None,
}

/// Attempts in fallback order.
const FALLBACK_CHAIN: [Source; 2] = [Source::Envelope, Source::Json];

/// Result of decoding one inbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Flat, namespaced keys. Later sub-messages overwrite earlier ones.
    pub params: FieldMap,
    /// Nested records of schema-decoded sub-messages, in envelope order.
    pub records: Vec<(CommandId, Record)>,
    pub source: Source,
}

impl Decoded {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Stateless decoder for one device.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a message received on `topic`. Never fails: malformed input
    /// degrades to fewer (or no) values.
    pub fn decode(&self, topic: Topic, data: &[u8]) -> Decoded {
        for source in FALLBACK_CHAIN {
            if source == Source::Json && !self.json_allowed(topic) {
                debug!("{topic}: json fallback not allowed, skipped");
                continue;
            }
            match self.attempt(source, data) {
                Ok(Some(decoded)) => {
                    debug!("{topic}: {source:?} gave {} params", decoded.params.len());
                    return decoded;
                }
                Ok(None) => debug!("{topic}: {source:?} held nothing"),
                Err(e) => debug!("{topic}: {source:?} attempt failed: {e}"),
            }
        }
        debug!("{topic}: {} bytes not decoded", data.len());
        Decoded::default()
    }

    /// Decode every sub-message of a parsed envelope.
    ///
    /// A sub-message that fails to decode is logged and skipped; the rest
    /// still contribute.
    pub fn decode_envelope(&self, envelope: &Envelope) -> Decoded {
        let mut out = Decoded { source: Source::Envelope, ..Decoded::default() };
        for msg in &envelope.msgs {
            self.decode_sub_message(msg, &mut out);
        }
        out
    }

    fn decode_sub_message(&self, msg: &SubMessage, out: &mut Decoded) {
        let id = msg.command_id();
        if let Some(expected) = self.config.serial.as_deref() {
            if msg.is_foreign(expected) {
                debug!(
                    "{id}: serial {:?} is not {expected}, dropped",
                    msg.device_sn.as_deref().unwrap_or_default()
                );
                return;
            }
        }

        let payload = msg.plain_payload(self.config.xor_policy);
        match protocol::decode_payload(id, &payload) {
            Ok(Some(decoded)) => {
                out.params.extend(decoded.params);
                if let Some(record) = decoded.record {
                    out.records.push((id, record));
                }
            }
            Ok(None) => {
                let shown = &payload[..payload.len().min(TRACE_BYTES)];
                trace!(
                    "{id}: no codec ({} -> {}), {} bytes: {}",
                    msg.src_addr(),
                    msg.dest_addr(),
                    payload.len(),
                    hex::encode_upper(shown)
                );
            }
            Err(e) => {
                error!("{id}: failed to decode {} byte payload: {e}", payload.len());
            }
        }
    }

    fn json_allowed(&self, topic: Topic) -> bool {
        self.config.json_fallback && topic.is_device_originated()
    }

    fn attempt(&self, source: Source, data: &[u8]) -> Result<Option<Decoded>> {
        match source {
            Source::Envelope => {
                let envelope = Envelope::parse(data)?;
                if envelope.msgs.is_empty() {
                    return Ok(None);
                }
                Ok(Some(self.decode_envelope(&envelope)))
            }
            Source::Json => {
                let params = decode_json(data)?;
                Ok(Some(Decoded { params, source: Source::Json, ..Decoded::default() }))
            }
            Source::None => Ok(None),
        }
    }
}

/// Flatten a JSON body: its `params` object when present, else the object
/// itself. Nested objects become dotted keys; nulls are dropped.
pub fn decode_json(data: &[u8]) -> Result<FieldMap> {
    let root: serde_json::Value = serde_json::from_slice(data)?;
    let serde_json::Value::Object(mut object) = root else {
        return Err(WireError::JsonNotObject);
    };
    let body = match object.remove("params") {
        Some(serde_json::Value::Object(params)) => params,
        Some(other) => {
            object.insert("params".to_string(), other);
            object
        }
        None => object,
    };

    let mut record = Record::new();
    for (key, value) in body {
        if let Some(node) = json_node(value) {
            record.insert(key, node);
        }
    }
    Ok(flatten::flatten(&record))
}

fn json_node(value: serde_json::Value) -> Option<Node> {
    use serde_json::Value as Json;
    let node = match value {
        Json::Null => return None,
        Json::Bool(b) => Node::Scalar(Value::Bool(b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Node::Scalar(Value::Int(i)),
            None => Node::Scalar(Value::Float(n.as_f64().unwrap_or(f64::NAN))),
        },
        Json::String(s) => Node::Scalar(Value::Str(s)),
        Json::Array(items) => Node::List(items.into_iter().filter_map(json_node).collect()),
        Json::Object(map) => {
            Node::Record(map.into_iter().filter_map(|(k, v)| json_node(v).map(|n| (k, n))).collect())
        }
    };
    Some(node)
}
