//! Split 64-bit hashes, hex encoding, distance, and bucket keys.
//!
//! Hashes are stored and compared as two unsigned 32-bit halves so the
//! catalog can keep them in plain integer columns.

/// Split a 16-digit hex hash into its (hi, lo) halves.
///
/// Returns `None` unless the input is exactly 16 hex digits. Either case
/// parses, but [`hi_lo_to_hex64`] always renders lowercase, so compare
/// hashes as integers (or lowercase both sides), never as raw input text.
pub fn split_hex64_to_hi_lo(hex: &str) -> Option<(u32, u32)> {
    if hex.len() != 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u64::from_str_radix(hex, 16).ok()?;
    Some(split_u64(value))
}

/// Join two halves back into a lowercase 16-digit hex string
pub fn hi_lo_to_hex64(hi: u32, lo: u32) -> String {
    format!("{:08x}{:08x}", hi, lo)
}

/// Split a hash into (hi, lo) halves
pub fn split_u64(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Join (hi, lo) halves into one hash
pub fn join_u64(hi: u32, lo: u32) -> u64 {
    ((hi as u64) << 32) | lo as u64
}

/// Number of differing bits across both halves
pub fn hamming_distance64(a_hi: u32, a_lo: u32, b_hi: u32, b_lo: u32) -> u32 {
    (a_hi ^ b_hi).count_ones() + (a_lo ^ b_lo).count_ones()
}

/// Coarse index key: the top 16 bits of the high half
pub fn derive_bucket16(hi: u32) -> u16 {
    ((hi >> 16) & 0xFFFF) as u16
}
