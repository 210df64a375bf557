//! Per-message XOR obfuscation.
//!
//! Sub-messages with `enc_type == 1` carry a payload XORed byte-wise with the
//! low byte of their sequence number.

/// Encryption type value marking an XOR-obfuscated payload.
pub const ENC_TYPE_XOR: i32 = 1;

/// XOR every byte with `seq & 0xFF`. Self-inverse.
pub fn xor_transform(payload: &[u8], seq: i32) -> Vec<u8> {
    let key = seq as u8;
    payload.iter().map(|b| b ^ key).collect()
}

/// When to de-obfuscate an inbound payload.
///
/// Firmware variants differ: some set `enc_type` on everything they send,
/// others only on frames relayed from a different source address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum XorPolicy {
    /// Apply whenever `enc_type == 1`.
    #[default]
    FlagOnly,
    /// Apply when `enc_type == 1` and `src` is not the device's own address.
    FlagAndForeignSource { device_src: i32 },
}

impl XorPolicy {
    pub fn applies(&self, enc_type: i32, src: i32) -> bool {
        if enc_type != ENC_TYPE_XOR {
            return false;
        }
        match *self {
            XorPolicy::FlagOnly => true,
            XorPolicy::FlagAndForeignSource { device_src } => src != device_src,
        }
    }
}
