//! Bit-field helpers shared by the decoder and the execution unit

/// Returns bits `start..=end` of `word`, shifted down to bit 0.
/// Bit 0 is the least significant bit.
pub fn extract_bits(word: u32, start: u32, end: u32) -> u32 {
    debug_assert!(start <= end && end < 32);
    let mask = u32::MAX >> (31 - (end - start));
    (word >> start) & mask
}

/// Sign-extends `value`, treating bit `significant_bits - 1` as the sign bit
pub fn sign_extend(value: u32, significant_bits: u32) -> u32 {
    debug_assert!((1..=32).contains(&significant_bits));
    let shamt = 32 - significant_bits;
    (((value << shamt) as i32) >> shamt) as u32
}
