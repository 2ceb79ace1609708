//! Bit-level helpers for channel bitmaps

/// True when the MSB-first bit at `index` of `byte` is set.
///
/// Channel bitmaps place channel k at bit (k - 1) % 8 of bitmap byte
/// (k - 1) / 8, counting bits from the most significant end. `index` must
/// be in 0..8.
pub fn channel_bit(byte: u8, index: u8) -> bool {
    debug_assert!(index < 8);
    byte & (0x80 >> index) != 0
}

/// Render a byte as an 8-character binary string, most significant bit first.
///
/// Matches the bit order of [`channel_bit`]; handy when logging or asserting
/// on a bitmap byte.
pub fn bit_string(byte: u8) -> String {
    format!("{:08b}", byte)
}
