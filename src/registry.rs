//! Settable device fields.
//!
//! One table shared by the command encoder (name to wire key) and the
//! settings decoder (field number back to name). Field numbers follow the
//! firmware's config-write message. Each entry carries its snake_case
//! command name and the camelCase name used for decoded state keys; lookups
//! accept either.

use crate::error::{Result, WireError};
use crate::wire::{self, WIRE_LEN, WIRE_VARINT};

/// How the declared payload length of a set command is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenPolicy {
    /// Always this many bytes (on/off flags).
    Fixed(u32),
    /// The emitted payload length. Every extra varint byte counts, so 128
    /// already declares one more byte than 127 and values from 16384 two
    /// more; a single `+1` for values above 128 would under-declare both.
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub number: u32,
    /// Command-side name, e.g. `en_beep`.
    pub name: &'static str,
    /// State-key name, e.g. `enBeep`.
    pub camel: &'static str,
    pub wire_type: u8,
    pub len_policy: LenPolicy,
    /// False for fields the device reports but no set command is known for.
    pub writable: bool,
}

impl FieldSpec {
    /// Wire key for this field.
    pub fn key(&self) -> u64 {
        wire::field_key(self.number, self.wire_type)
    }

    /// True for nested groups encoded length-delimited.
    pub fn is_group(&self) -> bool {
        self.wire_type == WIRE_LEN
    }

    /// Declared payload length for a set command whose payload is `pdata`.
    pub fn data_len_for(&self, pdata: &[u8]) -> u32 {
        match self.len_policy {
            LenPolicy::Fixed(len) => len,
            LenPolicy::Variable => pdata.len() as u32,
        }
    }
}

const fn flag(number: u32, name: &'static str, camel: &'static str) -> FieldSpec {
    FieldSpec {
        number,
        name,
        camel,
        wire_type: WIRE_VARINT,
        len_policy: LenPolicy::Fixed(key_len(number) + 1),
        writable: true,
    }
}

const fn level(number: u32, name: &'static str, camel: &'static str) -> FieldSpec {
    FieldSpec { len_policy: LenPolicy::Variable, ..flag(number, name, camel) }
}

const fn reported(number: u32, name: &'static str, camel: &'static str) -> FieldSpec {
    FieldSpec { writable: false, ..flag(number, name, camel) }
}

const fn key_len(number: u32) -> u32 {
    // Varint keys: 7 bits per byte.
    let key = (number as u64) << 3;
    if key < 1 << 7 {
        1
    } else if key < 1 << 14 {
        2
    } else {
        3
    }
}

/// Energy-backup group: outer field and its inner sub-fields.
pub mod backup {
    pub const FIELD: u32 = 43;
    pub const ENABLE: u32 = 1;
    pub const START_SOC: u32 = 2;
}

/// The energy-backup group entry.
pub const ENERGY_BACKUP: FieldSpec = FieldSpec {
    number: backup::FIELD,
    name: "energy_backup",
    camel: "energyBackup",
    wire_type: WIRE_LEN,
    len_policy: LenPolicy::Variable,
    writable: true,
};

/// Set-reply acknowledgement flag.
pub const CONFIG_OK: u32 = 2;

pub static FIELDS: &[FieldSpec] = &[
    flag(9, "en_beep", "enBeep"),
    flag(18, "cfg_dc12v_out_open", "cfgDc12vOutOpen"),
    flag(25, "xboost_en", "xboostEn"),
    level(33, "cms_max_chg_soc", "cmsMaxChgSoc"),
    level(34, "cms_min_dsg_soc", "cmsMinDsgSoc"),
    ENERGY_BACKUP,
    level(54, "plug_in_info_ac_in_chg_pow_max", "plugInInfoAcInChgPowMax"),
    // DC output is switched through field 18.
    reported(74, "dc_out_open", "dcOutOpen"),
    flag(76, "cfg_ac_out_open", "cfgAcOutOpen"),
    level(87, "plug_in_info_pv_dc_amp_max", "plugInInfoPvDcAmpMax"),
    flag(90, "pv_chg_type", "pvChgType"),
    flag(141, "output_power_off_memory", "outputPowerOffMemory"),
];

/// Look up a settable field by snake_case or camelCase name.
pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name || f.camel == name)
}

/// Like [`lookup`], but an unknown name is an error.
pub fn require(name: &str) -> Result<&'static FieldSpec> {
    lookup(name).ok_or_else(|| WireError::UnknownField { name: name.to_string() })
}

/// Like [`require`], but the field must also accept set commands.
pub fn require_writable(name: &str) -> Result<&'static FieldSpec> {
    let spec = require(name)?;
    if !spec.writable {
        return Err(WireError::ReadOnlyField { name: spec.name });
    }
    Ok(spec)
}

/// Reverse lookup by field number.
pub fn by_number(number: u32) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.number == number)
}
