//! Set command echoes (`254_17`) and set replies (`254_18`).
//!
//! These payloads have no schema: they are scanned with
//! [`crate::raw::parse_fields`] and named through the registry. Results land
//! under the display-upload namespace (`254_21.`) so a setting reads the
//! same whether it arrived in a periodic upload or a set reply.

use log::debug;

use super::{CommandId, PayloadCodec, PayloadOutput};
use crate::error::Result;
use crate::raw;
use crate::registry::{self, CONFIG_OK, backup};
use crate::value::{FieldMap, Value};

/// Namespace for current settings.
pub const SETTINGS_NAMESPACE: CommandId = CommandId::DISPLAY_UPLOAD;

/// Keys for the energy-backup group members.
pub const BACKUP_ENABLED_KEY: &str = "energyBackupEn";
pub const BACKUP_START_SOC_KEY: &str = "energyBackupStartSoc";

#[derive(Debug)]
pub struct SettingsCodec {
    name: &'static str,
    /// Replies only count when the device acknowledged the change.
    require_config_ok: bool,
}

pub static ECHO: SettingsCodec = SettingsCodec { name: "set", require_config_ok: false };
pub static REPLY: SettingsCodec = SettingsCodec { name: "set_reply", require_config_ok: true };

impl SettingsCodec {
    /// Decode into un-namespaced camelCase keys.
    pub fn decode_fields(&self, payload: &[u8]) -> FieldMap {
        let fields = raw::parse_fields(payload);
        let mut out = FieldMap::new();

        if self.require_config_ok && fields.get(&CONFIG_OK).copied().unwrap_or(0) == 0 {
            debug!("{}: config not acknowledged, ignored", self.name);
            return out;
        }

        for (number, value) in &fields {
            if let Some(spec) = registry::by_number(*number).filter(|s| !s.is_group()) {
                out.insert(spec.camel.to_string(), Value::Int(*value as i64));
            }
        }

        // The backup group is the one nested field; an absent enable flag means off.
        if let Some(inner) = raw::find_nested(payload, backup::FIELD) {
            let group = raw::parse_fields(inner);
            let enabled = group.get(&backup::ENABLE).copied().unwrap_or(0);
            out.insert(BACKUP_ENABLED_KEY.to_string(), Value::Int(enabled as i64));
            if let Some(soc) = group.get(&backup::START_SOC) {
                out.insert(BACKUP_START_SOC_KEY.to_string(), Value::Int(*soc as i64));
            }
        }

        out
    }
}

impl PayloadCodec for SettingsCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, _id: CommandId, payload: &[u8]) -> Result<PayloadOutput> {
        let prefix = SETTINGS_NAMESPACE.prefix();
        let params = self
            .decode_fields(payload)
            .into_iter()
            .map(|(k, v)| (format!("{prefix}{k}"), v))
            .collect();
        Ok(PayloadOutput { params, record: None })
    }
}
