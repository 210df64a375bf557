//! Outer envelope parsing and encoding.
//!
//! Wire format (protobuf):
//! ```text
//! Envelope   { repeated SubMessage msg = 1; }
//! SubMessage { bytes pdata = 1; int32 src = 2; ... string device_sn = 25; }
//! ```
//! Integer fields are int32. Unknown fields are skipped.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::addr::NodeAddr;
use crate::error::Result;
use crate::protocol::CommandId;
use crate::wire::{self, FieldReader, WireValue};
use crate::xor::{self, XorPolicy};

const ENVELOPE_MSG: u32 = 1;

const F_PDATA: u32 = 1;
const F_SRC: u32 = 2;
const F_DEST: u32 = 3;
const F_D_SRC: u32 = 4;
const F_D_DEST: u32 = 5;
const F_ENC_TYPE: u32 = 6;
const F_CHECK_TYPE: u32 = 7;
const F_CMD_FUNC: u32 = 8;
const F_CMD_ID: u32 = 9;
const F_DATA_LEN: u32 = 10;
const F_NEED_ACK: u32 = 11;
const F_IS_ACK: u32 = 12;
const F_SEQ: u32 = 14;
const F_PRODUCT_ID: u32 = 15;
const F_VERSION: u32 = 16;
const F_PAYLOAD_VER: u32 = 17;
const F_TIME_SNAP: u32 = 18;
const F_IS_RW_CMD: u32 = 19;
const F_IS_QUEUE: u32 = 20;
const F_ACK_TYPE: u32 = 21;
const F_CODE: u32 = 22;
const F_FROM: u32 = 23;
const F_MODULE_SN: u32 = 24;
const F_DEVICE_SN: u32 = 25;

/// Sequence numbers stay inside the positive int32 range.
pub const SEQ_MODULUS: u64 = 2_147_483_647;

/// One routed unit inside an envelope.
#[derive(Clone, Default, PartialEq)]
pub struct SubMessage {
    pub pdata: Vec<u8>,
    pub src: i32,
    pub dest: i32,
    pub d_src: i32,
    pub d_dest: i32,
    pub enc_type: i32,
    pub check_type: i32,
    pub cmd_func: i32,
    pub cmd_id: i32,
    /// Declared payload length. Not checked against `pdata.len()`.
    pub data_len: i32,
    pub need_ack: i32,
    pub is_ack: i32,
    pub seq: i32,
    pub product_id: i32,
    pub version: i32,
    pub payload_ver: i32,
    pub time_snap: i32,
    pub is_rw_cmd: i32,
    pub is_queue: i32,
    pub ack_type: i32,
    pub code: Option<String>,
    pub from: Option<String>,
    pub module_sn: Option<String>,
    /// Target/origin device serial. `None` or empty means any device.
    pub device_sn: Option<String>,
}

impl SubMessage {
    /// The (function, id) pair classifying this sub-message's payload.
    pub fn command_id(&self) -> CommandId {
        CommandId::new(self.cmd_func, self.cmd_id)
    }

    pub fn src_addr(&self) -> NodeAddr {
        NodeAddr::from_raw(self.src)
    }

    pub fn dest_addr(&self) -> NodeAddr {
        NodeAddr::from_raw(self.dest)
    }

    /// True when the serial is set and names a different device.
    pub fn is_foreign(&self, expected_sn: &str) -> bool {
        match self.device_sn.as_deref() {
            Some(sn) => !sn.is_empty() && sn != expected_sn,
            None => false,
        }
    }

    /// Payload bytes with XOR obfuscation removed when `policy` says so.
    pub fn plain_payload(&self, policy: XorPolicy) -> Vec<u8> {
        if policy.applies(self.enc_type, self.src) {
            xor::xor_transform(&self.pdata, self.seq)
        } else {
            self.pdata.clone()
        }
    }

    /// Parse one sub-message from its protobuf bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut msg = SubMessage::default();
        for item in FieldReader::new(data) {
            let (field, value) = item.map_err(|e| e.with_raw(data))?;
            match (field, value) {
                (F_PDATA, WireValue::Bytes(b)) => msg.pdata = b.to_vec(),
                (F_CODE, WireValue::Bytes(b)) => msg.code = Some(utf8(b)?),
                (F_FROM, WireValue::Bytes(b)) => msg.from = Some(utf8(b)?),
                (F_MODULE_SN, WireValue::Bytes(b)) => msg.module_sn = Some(utf8(b)?),
                (F_DEVICE_SN, WireValue::Bytes(b)) => msg.device_sn = Some(utf8(b)?),
                (F_PDATA | F_CODE | F_FROM | F_MODULE_SN | F_DEVICE_SN, other) => {
                    debug!("SubMessage field {field}: wire type {}, skipped", other.wire_type());
                }
                (field, WireValue::Varint(v)) => {
                    // int32 on the wire: keep the low 32 bits.
                    let v = v as i32;
                    match field {
                        F_SRC => msg.src = v,
                        F_DEST => msg.dest = v,
                        F_D_SRC => msg.d_src = v,
                        F_D_DEST => msg.d_dest = v,
                        F_ENC_TYPE => msg.enc_type = v,
                        F_CHECK_TYPE => msg.check_type = v,
                        F_CMD_FUNC => msg.cmd_func = v,
                        F_CMD_ID => msg.cmd_id = v,
                        F_DATA_LEN => msg.data_len = v,
                        F_NEED_ACK => msg.need_ack = v,
                        F_IS_ACK => msg.is_ack = v,
                        F_SEQ => msg.seq = v,
                        F_PRODUCT_ID => msg.product_id = v,
                        F_VERSION => msg.version = v,
                        F_PAYLOAD_VER => msg.payload_ver = v,
                        F_TIME_SNAP => msg.time_snap = v,
                        F_IS_RW_CMD => msg.is_rw_cmd = v,
                        F_IS_QUEUE => msg.is_queue = v,
                        F_ACK_TYPE => msg.ack_type = v,
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Ok(msg)
    }

    /// Encode as protobuf bytes. Zero integers and `None` strings are omitted.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(48 + self.pdata.len());
        if !self.pdata.is_empty() {
            wire::write_bytes_field(&mut buf, F_PDATA, &self.pdata);
        }
        for (field, v) in [
            (F_SRC, self.src),
            (F_DEST, self.dest),
            (F_D_SRC, self.d_src),
            (F_D_DEST, self.d_dest),
            (F_ENC_TYPE, self.enc_type),
            (F_CHECK_TYPE, self.check_type),
            (F_CMD_FUNC, self.cmd_func),
            (F_CMD_ID, self.cmd_id),
            (F_DATA_LEN, self.data_len),
            (F_NEED_ACK, self.need_ack),
            (F_IS_ACK, self.is_ack),
            (F_SEQ, self.seq),
            (F_PRODUCT_ID, self.product_id),
            (F_VERSION, self.version),
            (F_PAYLOAD_VER, self.payload_ver),
            (F_TIME_SNAP, self.time_snap),
            (F_IS_RW_CMD, self.is_rw_cmd),
            (F_IS_QUEUE, self.is_queue),
            (F_ACK_TYPE, self.ack_type),
        ] {
            wire::write_nonzero_field(&mut buf, field, v);
        }
        for (field, s) in [
            (F_CODE, &self.code),
            (F_FROM, &self.from),
            (F_MODULE_SN, &self.module_sn),
            (F_DEVICE_SN, &self.device_sn),
        ] {
            if let Some(s) = s {
                wire::write_bytes_field(&mut buf, field, s.as_bytes());
            }
        }
        buf
    }
}

impl fmt::Debug for SubMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "254_21 DEV→CTL seq=1234 enc=1 len=88/88 sn=R631... | 0A12..."
        write!(
            f,
            "{} {}→{} seq={} enc={} len={}/{}",
            self.command_id(),
            self.src_addr(),
            self.dest_addr(),
            self.seq,
            self.enc_type,
            self.data_len,
            self.pdata.len(),
        )?;
        if let Some(sn) = &self.device_sn {
            write!(f, " sn={sn}")?;
        }
        if !self.pdata.is_empty() {
            let limit = 20;
            write!(f, " | {}", hex::encode_upper(&self.pdata[..self.pdata.len().min(limit)]))?;
            if self.pdata.len() > limit {
                write!(f, "...")?;
            }
        }
        Ok(())
    }
}

/// Outer container: one or more sub-messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub msgs: Vec<SubMessage>,
}

impl Envelope {
    /// Parse an envelope. Truncated or undecodable bytes fail the whole
    /// parse; a field with an unexpected wire type is skipped.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut msgs = Vec::new();
        for item in FieldReader::new(data) {
            let (field, value) = item.map_err(|e| e.with_raw(data))?;
            match (field, value) {
                (ENVELOPE_MSG, WireValue::Bytes(b)) => msgs.push(SubMessage::parse(b)?),
                (ENVELOPE_MSG, other) => {
                    debug!("Envelope field {field}: wire type {}, skipped", other.wire_type());
                }
                _ => {}
            }
        }
        Ok(Self { msgs })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for msg in &self.msgs {
            wire::write_bytes_field(&mut buf, ENVELOPE_MSG, &msg.encode());
        }
        buf
    }
}

// ---------------------------------------------------------------------------
// Outbound set-command framing
// ---------------------------------------------------------------------------

/// Fixed routing and versioning for outbound set commands.
pub mod outbound {
    pub const D_SRC: i32 = 1;
    pub const D_DEST: i32 = 1;
    pub const NEED_ACK: i32 = 1;
    pub const PRODUCT_ID: i32 = 1;
    pub const VERSION: i32 = 19;
    pub const PAYLOAD_VER: i32 = 1;
}

/// Fresh sequence number: Unix time in milliseconds folded into `0..2^31-1`.
pub fn next_seq() -> i32 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    (millis % u128::from(SEQ_MODULUS)) as i32
}

/// Wrap a set-command payload into a single-message envelope.
pub fn set_command_envelope(pdata: Vec<u8>, serial: &str, data_len: i32, seq: i32) -> Envelope {
    let id = CommandId::SET;
    let msg = SubMessage {
        pdata,
        src: NodeAddr::CONTROLLER,
        dest: NodeAddr::DEVICE,
        d_src: outbound::D_SRC,
        d_dest: outbound::D_DEST,
        cmd_func: id.func,
        cmd_id: id.id,
        data_len,
        need_ack: outbound::NEED_ACK,
        seq,
        product_id: outbound::PRODUCT_ID,
        version: outbound::VERSION,
        payload_ver: outbound::PAYLOAD_VER,
        device_sn: Some(serial.to_string()),
        ..Default::default()
    };
    Envelope { msgs: vec![msg] }
}

fn utf8(b: &[u8]) -> Result<String> {
    Ok(String::from_utf8(b.to_vec())?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SubMessage {
        SubMessage {
            pdata: vec![0x48, 0x01],
            src: 2,
            dest: 32,
            cmd_func: 254,
            cmd_id: 21,
            data_len: 2,
            seq: 123_456,
            enc_type: 1,
            device_sn: Some("R631ZEB4WH123456".into()),
            ..Default::default()
        }
    }

    #[test]
    fn round_trip() {
        let env = Envelope { msgs: vec![sample(), SubMessage { cmd_id: 22, ..sample() }] };
        let parsed = Envelope::parse(&env.encode()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn set_command_vector() {
        let env = set_command_envelope(vec![0x48, 0x01], "SN", 2, 5);
        let wire = env.encode();
        // msg = 1, LEN
        assert_eq!(wire[0], 0x0A);
        assert_eq!(wire[1] as usize, wire.len() - 2);
        let inner = &wire[2..];
        let expected = [
            0x0A, 0x02, 0x48, 0x01, // pdata
            0x10, 0x20, // src 32
            0x18, 0x02, // dest 2
            0x20, 0x01, // d_src 1
            0x28, 0x01, // d_dest 1
            0x40, 0xFE, 0x01, // cmd_func 254
            0x48, 0x11, // cmd_id 17
            0x50, 0x02, // data_len 2
            0x58, 0x01, // need_ack 1
            0x70, 0x05, // seq 5
            0x78, 0x01, // product_id 1
            0x80, 0x01, 0x13, // version 19
            0x88, 0x01, 0x01, // payload_ver 1
            0xCA, 0x01, 0x02, b'S', b'N', // device_sn
        ];
        assert_eq!(inner, expected);
    }

    #[test]
    fn negative_int32_truncates() {
        let msg = SubMessage { seq: -5, ..sample() };
        let parsed = SubMessage::parse(&msg.encode()).unwrap();
        assert_eq!(parsed.seq, -5);
    }

    #[test]
    fn skips_unknown_fields() {
        let mut buf = sample().encode();
        // field 99 fixed32
        wire::write_key(&mut buf, 99, wire::WIRE_FIXED32);
        buf.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(SubMessage::parse(&buf).unwrap(), sample());
    }

    #[test]
    fn tolerates_data_len_mismatch() {
        let msg = SubMessage { data_len: 200, ..sample() };
        let parsed = SubMessage::parse(&msg.encode()).unwrap();
        assert_eq!(parsed.data_len, 200);
        assert_eq!(parsed.pdata.len(), 2);
    }

    #[test]
    fn garbage_fails() {
        assert!(Envelope::parse(b"{\"params\":{}}").is_err());
        assert!(Envelope::parse(&[0x0A, 0x09, 0x01]).is_err());
    }

    #[test]
    fn wrong_wire_type_for_pdata_is_skipped() {
        // pdata as varint, then cmd_func 254
        let buf = [0x08, 0x01, 0x40, 0xFE, 0x01];
        let msg = SubMessage::parse(&buf).unwrap();
        assert!(msg.pdata.is_empty());
        assert_eq!(msg.cmd_func, 254);
    }

    #[test]
    fn stray_varint_msg_field_is_skipped() {
        let mut buf = vec![0x08, 0x05]; // msg = 1 as varint
        buf.extend(Envelope { msgs: vec![sample()] }.encode());
        let env = Envelope::parse(&buf).unwrap();
        assert_eq!(env.msgs, vec![sample()]);
    }

    #[test]
    fn foreign_serial() {
        let msg = sample();
        assert!(!msg.is_foreign("R631ZEB4WH123456"));
        assert!(msg.is_foreign("OTHER"));
        let any = SubMessage { device_sn: Some(String::new()), ..sample() };
        assert!(!any.is_foreign("OTHER"));
        let unset = SubMessage { device_sn: None, ..sample() };
        assert!(!unset.is_foreign("OTHER"));
    }

    #[test]
    fn plain_payload_decrypts() {
        let mut msg = sample();
        msg.pdata = xor::xor_transform(&[0x48, 0x01], msg.seq);
        assert_eq!(msg.plain_payload(XorPolicy::FlagOnly), vec![0x48, 0x01]);
        let gated = XorPolicy::FlagAndForeignSource { device_src: 2 };
        assert_eq!(msg.plain_payload(gated), msg.pdata);
    }

    #[test]
    fn seq_in_range() {
        let seq = next_seq();
        assert!(seq >= 0);
    }
}
