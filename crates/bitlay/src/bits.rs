//! Low-level bit read and manipulation utilities for byte slices.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first byte.
//! Callers guarantee that every addressed position lies inside `data`.

/// Reads a single bit at `bit_pos` (0 = MSB of first byte). Returns 0 or 1.
pub fn read_bit_at(data: &[u8], bit_pos: usize) -> u8 {
    (data[bit_pos / 8] >> (7 - bit_pos % 8)) & 1
}

/// Writes a single bit at `bit_pos`; any non-zero `bit` sets it.
pub fn write_bit_at(data: &mut [u8], bit_pos: usize, bit: u8) {
    let mask = 0x80u8 >> (bit_pos % 8);
    let byte = &mut data[bit_pos / 8];
    if bit != 0 {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Reads `n` bits (at most 64) starting at `bit_pos` as an unsigned value, MSB-first.
pub fn read_bits_at(data: &[u8], bit_pos: usize, n: usize) -> u64 {
    debug_assert!(n <= 64);

    let mut value = 0u64;
    for pos in bit_pos..bit_pos + n {
        value = (value << 1) | read_bit_at(data, pos) as u64;
    }

    value
}

/// Writes the low `n` bits (at most 64) of `value` starting at `bit_pos`, MSB-first.
pub fn write_bits_at(data: &mut [u8], bit_pos: usize, n: usize, value: u64) {
    debug_assert!(n <= 64);

    for i in 0..n {
        let bit = (value >> (n - 1 - i)) & 1;
        write_bit_at(data, bit_pos + i, bit as u8);
    }
}

/// Mask selecting bits `lo..hi` (MSB-first, `hi <= 8`) of one byte.
pub fn byte_mask(lo: usize, hi: usize) -> u8 {
    ((0xFFu16 >> lo) & !(0xFFu16 >> hi)) as u8
}

/// Applies `op` to every byte overlapping `bit_start..bit_start + bit_count`.
///
/// Only the bits of `op(byte)` inside the range are stored; bits outside the
/// range keep their value even when they share a byte with it.
pub fn apply_masked(
    data: &mut [u8],
    bit_start: usize,
    bit_count: usize,
    op: impl Fn(u8) -> u8,
) {
    if bit_count == 0 {
        return;
    }

    let end = bit_start + bit_count;
    let first = bit_start / 8;
    let last = (end - 1) / 8;

    for index in first..=last {
        let lo = if index == first { bit_start % 8 } else { 0 };
        let hi = if index == last { end - index * 8 } else { 8 };
        let mask = byte_mask(lo, hi);

        let byte = data[index];
        data[index] = (byte & !mask) | (op(byte) & mask);
    }
}

/// Counts set bits in `bit_start..bit_start + bit_count`.
pub fn count_ones(data: &[u8], bit_start: usize, bit_count: usize) -> usize {
    if bit_count == 0 {
        return 0;
    }

    let end = bit_start + bit_count;
    let first = bit_start / 8;
    let last = (end - 1) / 8;

    (first..=last)
        .map(|index| {
            let lo = if index == first { bit_start % 8 } else { 0 };
            let hi = if index == last { end - index * 8 } else { 8 };
            (data[index] & byte_mask(lo, hi)).count_ones() as usize
        })
        .sum()
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Reverses the low `n` bits of `x` (LSB becomes MSB of the result).
pub fn reverse_bits_n(mut x: u64, n: usize) -> u64 {
    let mut r = 0u64;
    for _ in 0..n {
        r = (r << 1) | (x & 1);
        x >>= 1;
    }

    r
}
