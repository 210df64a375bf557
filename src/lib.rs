pub mod addr;
pub mod command;
pub mod config;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod flatten;
pub mod protocol;
pub mod raw;
pub mod registry;
pub mod schema;
pub mod value;
pub mod varint;
pub mod wire;
pub mod xor;

pub use addr::NodeAddr;
pub use command::{SetCommand, Setting, build_energy_backup_command, build_set_command};
pub use config::DecoderConfig;
pub use decoder::{Decoded, Decoder, Source, Topic};
pub use envelope::{Envelope, SubMessage};
pub use error::WireError;
pub use flatten::flatten;
pub use protocol::{CommandId, PayloadCodec};
pub use raw::parse_fields;
pub use value::{FieldMap, Node, Record, Value};
pub use varint::{decode_varint, encode_varint};
pub use xor::{XorPolicy, xor_transform};
