//! Decoder configuration.

use crate::xor::XorPolicy;

/// Per-device decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Serial of the device this decoder serves. Sub-messages addressed to a
    /// different serial are dropped. `None` accepts every serial.
    pub serial: Option<String>,
    /// When to undo XOR obfuscation.
    pub xor_policy: XorPolicy,
    /// Try a JSON body when the bytes are not a binary envelope.
    pub json_fallback: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { serial: None, xor_policy: XorPolicy::default(), json_fallback: true }
    }
}

impl DecoderConfig {
    pub fn for_device(serial: impl Into<String>) -> Self {
        Self { serial: Some(serial.into()), ..Self::default() }
    }

    pub fn with_xor_policy(mut self, policy: XorPolicy) -> Self {
        self.xor_policy = policy;
        self
    }

    pub fn without_json_fallback(mut self) -> Self {
        self.json_fallback = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DecoderConfig::default();
        assert_eq!(cfg.serial, None);
        assert_eq!(cfg.xor_policy, XorPolicy::FlagOnly);
        assert!(cfg.json_fallback);
    }

    #[test]
    fn builder() {
        let cfg = DecoderConfig::for_device("R631")
            .with_xor_policy(XorPolicy::FlagAndForeignSource { device_src: 2 })
            .without_json_fallback();
        assert_eq!(cfg.serial.as_deref(), Some("R631"));
        assert!(!cfg.json_fallback);
    }
}
