//! Outbound set commands.
//!
//! A set command carries exactly one setting as a tiny protobuf payload,
//! wrapped in a single-message envelope addressed to the device with
//! function 254, id 17.

use crate::envelope::{self, Envelope};
use crate::error::{Result, WireError};
use crate::registry::{self, ENERGY_BACKUP, FieldSpec, backup};
use crate::varint::{to_wire_unsigned, write_varint};
use crate::wire;

/// The setting a command changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// A scalar registry field, by snake_case or camelCase name.
    Field { name: String, value: i64 },
    /// Energy-backup reserve. Disabling omits the enable sub-field.
    EnergyBackup { enabled: bool, start_soc: u32 },
}

/// A set command ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCommand {
    pub setting: Setting,
    pub serial: String,
    /// Overrides the computed declared payload length.
    pub data_len: Option<u32>,
}

impl SetCommand {
    pub fn field(name: impl Into<String>, value: i64, serial: impl Into<String>) -> Self {
        Self {
            setting: Setting::Field { name: name.into(), value },
            serial: serial.into(),
            data_len: None,
        }
    }

    pub fn energy_backup(enabled: bool, start_soc: u32, serial: impl Into<String>) -> Self {
        Self {
            setting: Setting::EnergyBackup { enabled, start_soc },
            serial: serial.into(),
            data_len: None,
        }
    }

    /// Force the declared payload length.
    pub fn with_data_len(mut self, data_len: u32) -> Self {
        self.data_len = Some(data_len);
        self
    }

    /// Payload bytes and the declared length that goes with them.
    pub fn payload(&self) -> Result<(Vec<u8>, u32)> {
        let (pdata, computed) = match &self.setting {
            Setting::Field { name, value } => {
                let spec = registry::require_writable(name)?;
                if spec.is_group() {
                    return Err(WireError::GroupField { name: spec.name });
                }
                field_payload(spec, *value)
            }
            Setting::EnergyBackup { enabled, start_soc } => backup_payload(*enabled, *start_soc),
        };
        Ok((pdata, self.data_len.unwrap_or(computed)))
    }

    /// Build the outbound envelope with the given sequence number.
    pub fn to_envelope(&self, seq: i32) -> Result<Envelope> {
        let (pdata, data_len) = self.payload()?;
        Ok(envelope::set_command_envelope(pdata, &self.serial, data_len as i32, seq))
    }

    /// Encode with a caller-chosen sequence number.
    pub fn encode_with_seq(&self, seq: i32) -> Result<Vec<u8>> {
        let env = self.to_envelope(seq)?;
        log::debug!("set command {:?}", env.msgs[0]);
        Ok(env.encode())
    }

    /// Encode with a fresh time-derived sequence number.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_with_seq(envelope::next_seq())
    }
}

/// Build envelope bytes that set `field_name` to `value` on device `serial`.
///
/// `data_len` overrides the declared payload length; by default it is
/// derived from the registry and matches the emitted bytes.
pub fn build_set_command(
    field_name: &str,
    value: i64,
    serial: &str,
    data_len: Option<u32>,
) -> Result<Vec<u8>> {
    let mut cmd = SetCommand::field(field_name, value, serial);
    cmd.data_len = data_len;
    cmd.encode()
}

/// Build envelope bytes that enable or disable the energy-backup reserve.
pub fn build_energy_backup_command(
    enabled: bool,
    start_soc: u32,
    serial: &str,
    data_len: Option<u32>,
) -> Result<Vec<u8>> {
    let mut cmd = SetCommand::energy_backup(enabled, start_soc, serial);
    cmd.data_len = data_len;
    cmd.encode()
}

fn field_payload(spec: &FieldSpec, value: i64) -> (Vec<u8>, u32) {
    let value = to_wire_unsigned(value);
    let mut pdata = Vec::with_capacity(8);
    write_varint(&mut pdata, spec.key());
    write_varint(&mut pdata, value);
    let len = spec.data_len_for(&pdata);
    (pdata, len)
}

fn backup_payload(enabled: bool, start_soc: u32) -> (Vec<u8>, u32) {
    let mut inner = Vec::with_capacity(4);
    if enabled {
        wire::write_varint_field(&mut inner, backup::ENABLE, 1);
    }
    wire::write_varint_field(&mut inner, backup::START_SOC, u64::from(start_soc));

    let mut pdata = Vec::with_capacity(inner.len() + 3);
    write_varint(&mut pdata, ENERGY_BACKUP.key());
    write_varint(&mut pdata, inner.len() as u64);
    pdata.extend_from_slice(&inner);
    let len = ENERGY_BACKUP.data_len_for(&pdata);
    (pdata, len)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::parse_fields;
    use crate::varint::encode_varint;

    #[test]
    fn beep_payload() {
        let (pdata, len) = SetCommand::field("en_beep", 1, "SN123").payload().unwrap();
        assert_eq!(pdata, vec![0x48, 0x01]);
        assert_eq!(len, 2);
    }

    #[test]
    fn beep_envelope() {
        let env = SetCommand::field("en_beep", 1, "SN123")
            .with_data_len(2)
            .to_envelope(99)
            .unwrap();
        assert_eq!(env.msgs.len(), 1);
        let m = &env.msgs[0];
        assert_eq!((m.cmd_func, m.cmd_id), (254, 17));
        assert_eq!(m.data_len, 2);
        assert_eq!(m.seq, 99);
        assert_eq!((m.src, m.dest, m.need_ack), (32, 2, 1));
        assert_eq!(m.device_sn.as_deref(), Some("SN123"));
        let mut expected = encode_varint((9 << 3) | 0);
        expected.extend(encode_varint(1));
        assert_eq!(m.pdata, expected);
    }

    #[test]
    fn camel_case_name_accepted() {
        let a = SetCommand::field("cfgAcOutOpen", 0, "SN").payload().unwrap();
        let b = SetCommand::field("cfg_ac_out_open", 0, "SN").payload().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0, vec![0xE0, 0x04, 0x00]);
        assert_eq!(a.1, 3);
    }

    #[test]
    fn unknown_field_is_error() {
        assert!(matches!(
            build_set_command("warp_drive", 1, "SN", None),
            Err(WireError::UnknownField { .. })
        ));
    }

    #[test]
    fn group_field_needs_group_setting() {
        assert!(matches!(
            SetCommand::field("energy_backup", 1, "SN").payload(),
            Err(WireError::GroupField { name: "energy_backup" })
        ));
    }

    #[test]
    fn reported_only_field_is_rejected() {
        assert!(matches!(
            build_set_command("dc_out_open", 1, "SN", None),
            Err(WireError::ReadOnlyField { name: "dc_out_open" })
        ));
        let (pdata, _) = SetCommand::field("cfg_dc12v_out_open", 1, "SN").payload().unwrap();
        assert_eq!(pdata, vec![0x90, 0x01, 0x01]);
    }

    #[test]
    fn negative_value_uses_u32() {
        let (pdata, _) = SetCommand::field("cms_min_dsg_soc", -1, "SN").payload().unwrap();
        assert_eq!(&pdata[2..], &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn variable_len_matches_bytes() {
        for value in [0, 1, 127, 128, 300] {
            let (pdata, len) =
                SetCommand::field("plug_in_info_ac_in_chg_pow_max", value, "SN").payload().unwrap();
            assert_eq!(len as usize, pdata.len(), "value {value}");
        }
    }

    #[test]
    fn backup_enable() {
        let (pdata, len) = SetCommand::energy_backup(true, 42, "SN").payload().unwrap();
        let inner = [0x08, 0x01, 0x10, 0x2A];
        let mut expected = encode_varint((43 << 3) | 2);
        expected.extend(encode_varint(inner.len() as i64));
        expected.extend_from_slice(&inner);
        assert_eq!(pdata, expected);
        assert_eq!(len, 7);
    }

    #[test]
    fn backup_disable_omits_enable() {
        let (pdata, len) = SetCommand::energy_backup(false, 42, "SN").payload().unwrap();
        assert_eq!(pdata, vec![0xDA, 0x02, 0x02, 0x10, 0x2A]);
        assert_eq!(len, 5);
        let inner = crate::raw::find_nested(&pdata, 43).unwrap();
        let fields = parse_fields(inner);
        assert!(!fields.contains_key(&1));
        assert_eq!(fields[&2], 42);
    }

    #[test]
    fn explicit_data_len_wins() {
        let (_, len) = SetCommand::energy_backup(true, 42, "SN").with_data_len(9).payload().unwrap();
        assert_eq!(len, 9);
    }
}
