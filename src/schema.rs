//! Table-driven protobuf message decoding.
//!
//! Each payload kind with a known structure is described by a static
//! [`Schema`]: field number, JSON-style (camelCase) name, and value kind.
//! Decoding yields a [`Record`] keyed by those names, mirroring what a
//! generated message rendered as a dict would contain: fields absent on the
//! wire are absent from the record, unknown fields are dropped. A known
//! field arriving with the wrong wire type is dropped the same way.

use log::debug;

use crate::error::{Result, WireError};
use crate::value::{Node, Record, Value};
use crate::varint::decode_varint;
use crate::wire::{self, FieldReader, WireValue};

/// A message definition.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

/// One field of a message definition.
#[derive(Debug)]
pub struct FieldDef {
    pub number: u32,
    pub name: &'static str,
    pub kind: Kind,
    pub repeated: bool,
}

/// An enum definition: wire value to symbolic name.
#[derive(Debug)]
pub struct EnumDef {
    pub name: &'static str,
    pub values: &'static [(i32, &'static str)],
}

impl EnumDef {
    pub fn name_of(&self, v: i32) -> Option<&'static str> {
        self.values.iter().find(|(n, _)| *n == v).map(|(_, name)| *name)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    UInt32,
    Int32,
    Float,
    Str,
    Enum(&'static EnumDef),
    Message(&'static Schema),
}

impl Kind {
    fn wire_type(self) -> u8 {
        match self {
            Kind::UInt32 | Kind::Int32 | Kind::Enum(_) => wire::WIRE_VARINT,
            Kind::Float => wire::WIRE_FIXED32,
            Kind::Str | Kind::Message(_) => wire::WIRE_LEN,
        }
    }
}

/// Shorthand for building field tables.
pub const fn field(number: u32, name: &'static str, kind: Kind) -> FieldDef {
    FieldDef { number, name, kind, repeated: false }
}

/// Shorthand for a repeated field.
pub const fn repeated(number: u32, name: &'static str, kind: Kind) -> FieldDef {
    FieldDef { number, name, kind, repeated: true }
}

impl Schema {
    pub fn field(&self, number: u32) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Decode `data` as an instance of this message.
    pub fn decode(&self, data: &[u8]) -> Result<Record> {
        let mut record = Record::new();
        for item in FieldReader::new(data) {
            let (number, value) = item.map_err(|e| e.with_raw(data))?;
            let Some(def) = self.field(number) else {
                continue;
            };

            // Packed repeated scalars arrive length-delimited.
            if def.repeated && def.kind.wire_type() != wire::WIRE_LEN {
                if let WireValue::Bytes(b) = value {
                    for node in self.unpack(def, b)? {
                        push(&mut record, def.name, node);
                    }
                    continue;
                }
            }

            let Some(node) = self.convert(def, value)? else {
                continue;
            };
            if def.repeated {
                push(&mut record, def.name, node);
            } else {
                merge(&mut record, def.name, node);
            }
        }
        Ok(record)
    }

    /// `None` when the wire type does not fit the field's kind.
    fn convert(&self, def: &FieldDef, value: WireValue<'_>) -> Result<Option<Node>> {
        let scalar = match (def.kind, value) {
            (Kind::UInt32, WireValue::Varint(v)) => Value::Int(i64::from(v as u32)),
            (Kind::Int32, WireValue::Varint(v)) => Value::Int(i64::from(v as i32)),
            (Kind::Enum(e), WireValue::Varint(v)) => match e.name_of(v as i32) {
                Some(name) => Value::Str(name.to_string()),
                None => Value::Int(i64::from(v as i32)),
            },
            (Kind::Float, WireValue::Fixed32(b)) => Value::Float(f64::from(f32::from_le_bytes(b))),
            (Kind::Str, WireValue::Bytes(b)) => Value::Str(String::from_utf8(b.to_vec())?),
            (Kind::Message(schema), WireValue::Bytes(b)) => {
                return Ok(Some(Node::Record(schema.decode(b)?)));
            }
            (kind, other) => {
                debug!(
                    "{}.{} (field {}): wire type {} where {} expected, skipped",
                    self.name,
                    def.name,
                    def.number,
                    other.wire_type(),
                    kind.wire_type()
                );
                return Ok(None);
            }
        };
        Ok(Some(Node::Scalar(scalar)))
    }

    fn unpack(&self, def: &FieldDef, data: &[u8]) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < data.len() {
            let value = match def.kind.wire_type() {
                wire::WIRE_FIXED32 => {
                    let chunk = data.get(idx..idx + 4).ok_or_else(|| {
                        WireError::truncated_field(def.number, idx, 4, data.len() - idx)
                    })?;
                    idx += 4;
                    WireValue::Fixed32([chunk[0], chunk[1], chunk[2], chunk[3]])
                }
                _ => {
                    let (v, next) = decode_varint(data, idx);
                    if data[next - 1] & 0x80 != 0 {
                        return Err(WireError::TruncatedVarint { offset: idx });
                    }
                    idx = next;
                    WireValue::Varint(v)
                }
            };
            out.extend(self.convert(def, value)?);
        }
        Ok(out)
    }
}

fn push(record: &mut Record, name: &str, node: Node) {
    match record.entry(name.to_string()).or_insert_with(|| Node::List(Vec::new())) {
        Node::List(items) => items.push(node),
        slot => *slot = Node::List(vec![node]),
    }
}

/// Singular fields: last value wins, embedded messages merge.
fn merge(record: &mut Record, name: &str, node: Node) {
    if let Node::Record(incoming) = node {
        if let Some(Node::Record(existing)) = record.get_mut(name) {
            existing.extend(incoming);
            return;
        }
        record.insert(name.to_string(), Node::Record(incoming));
        return;
    }
    record.insert(name.to_string(), node);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
