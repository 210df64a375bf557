//! Payload classification and decode dispatch.
//!
//! Every sub-message is classified by its (function, id) pair. Each known
//! pair maps to one [`PayloadCodec`]:
//!
//! - `254_21` display upload, `254_22` runtime upload: structured schema
//!   ([`structured::StructuredCodec`]).
//! - `254_17` set command echo, `254_18` set reply: schema-less tag/value
//!   scan ([`settings::SettingsCodec`]).
//!
//! Anything else is left undecoded. Codecs are independent; adding a payload
//! kind means adding a codec and a line in [`codec_for`].

pub mod display;
pub mod runtime;
pub mod settings;
pub mod statistics;
pub mod structured;

use std::fmt;

use crate::error::Result;
use crate::value::{FieldMap, Record};

// ---------------------------------------------------------------------------
// Command identity
// ---------------------------------------------------------------------------

/// The (function, id) pair classifying a sub-message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId {
    pub func: i32,
    pub id: i32,
}

impl CommandId {
    /// Private command function used by the power station.
    pub const PRIVATE_FUNC: i32 = 254;

    pub const SET: CommandId = CommandId::new(254, 17);
    pub const SET_REPLY: CommandId = CommandId::new(254, 18);
    pub const DISPLAY_UPLOAD: CommandId = CommandId::new(254, 21);
    pub const RUNTIME_UPLOAD: CommandId = CommandId::new(254, 22);

    pub const fn new(func: i32, id: i32) -> Self {
        Self { func, id }
    }

    /// Key namespace for fields decoded from this payload: `"254_21."`.
    pub fn prefix(&self) -> String {
        format!("{}_{}.", self.func, self.id)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.func, self.id)
    }
}

// ---------------------------------------------------------------------------
// Codecs
// ---------------------------------------------------------------------------

/// What one sub-message contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadOutput {
    /// Namespaced flat keys, ready to merge.
    pub params: FieldMap,
    /// Nested structure before flattening, when the payload has a schema.
    pub record: Option<Record>,
}

/// One payload interpretation strategy.
pub trait PayloadCodec: Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decode a de-obfuscated payload. On error nothing is contributed.
    fn decode(&self, id: CommandId, payload: &[u8]) -> Result<PayloadOutput>;
}

/// Pick the codec for a command identity, if it is one we decode.
pub fn codec_for(id: CommandId) -> Option<&'static dyn PayloadCodec> {
    match id {
        CommandId::DISPLAY_UPLOAD => Some(&display::CODEC),
        CommandId::RUNTIME_UPLOAD => Some(&runtime::CODEC),
        CommandId::SET => Some(&settings::ECHO),
        CommandId::SET_REPLY => Some(&settings::REPLY),
        _ => None,
    }
}

/// Decode one payload by identity. `Ok(None)` for unhandled identities.
pub fn decode_payload(id: CommandId, payload: &[u8]) -> Result<Option<PayloadOutput>> {
    match codec_for(id) {
        Some(codec) => codec.decode(id, payload).map(Some),
        None => Ok(None),
    }
}
