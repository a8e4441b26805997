//! Bit-granular views over a byte range.
//!
//! A [BitView] addresses `bit_count` bits starting `bit_start` bits into a
//! [ByteRange], MSB-first within each byte. Views never copy: slicing narrows
//! the addressed bits, and every mutation is a masked read-modify-write of the
//! underlying bytes that leaves bits outside the view untouched.
//!
//! ```
//! use bitlay::buffer::Buffer;
//!
//! let buffer = Buffer::from_hex("aa55").unwrap();
//! assert_eq!(buffer.bits().to_string(), "1010101001010101");
//! assert_eq!(buffer.bits().slice(4..-4).to_string(), "10100101");
//!
//! buffer.bits().invert().unwrap();
//! assert_eq!(buffer.to_hex(), "55aa");
//!
//! buffer.bits().slice(..8).set().unwrap();
//! assert_eq!(buffer.to_hex(), "ffaa");
//! ```

use std::{
    fmt,
    iter::FusedIterator,
    ops::{Bound, RangeBounds},
};

use crate::{
    bits,
    buffer::ByteRange,
    errors::BitError,
    types::BitOrder,
};

#[derive(Clone)]
pub struct BitView {
    range: ByteRange,
    bit_start: usize,
    bit_count: usize,
}

impl BitView {
    /// View over every bit of `range`.
    pub fn new(range: ByteRange) -> Self {
        let bit_count = range.len() * 8;
        Self {
            range,
            bit_start: 0,
            bit_count,
        }
    }

    pub fn range(&self) -> &ByteRange {
        &self.range
    }

    /// First addressed bit, counted from the MSB of the range's first byte.
    pub fn bit_start(&self) -> usize {
        self.bit_start
    }

    pub fn len(&self) -> usize {
        self.bit_count
    }

    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Resolves a possibly negative index, shifts it by `adjust`, then clamps
    /// the result into `0..=len`.
    fn clamp(&self, index: isize, adjust: isize) -> usize {
        let len = self.bit_count as isize;
        let index = if index < 0 { index.saturating_add(len) } else { index };
        index.saturating_add(adjust).clamp(0, len) as usize
    }

    /// Sub-view with slice semantics: negative bounds count from the end,
    /// out-of-range bounds clamp, and `start >= stop` gives an empty view.
    ///
    /// ```
    /// use bitlay::buffer::Buffer;
    ///
    /// let bits = Buffer::from_hex("f0").unwrap().bits();
    /// assert_eq!(bits.slice(2..).to_string(), "110000");
    /// assert_eq!(bits.slice(-3..).to_string(), "000");
    /// assert_eq!(bits.slice(..=1).to_string(), "11");
    /// assert!(bits.slice(20..).is_empty());
    /// ```
    pub fn slice(&self, bounds: impl RangeBounds<isize>) -> BitView {
        let start = match bounds.start_bound() {
            Bound::Included(&s) => self.clamp(s, 0),
            Bound::Excluded(&s) => self.clamp(s, 1),
            Bound::Unbounded => 0,
        };
        let stop = match bounds.end_bound() {
            Bound::Included(&e) => self.clamp(e, 1),
            Bound::Excluded(&e) => self.clamp(e, 0),
            Bound::Unbounded => self.bit_count,
        };
        let stop = stop.max(start);

        BitView {
            range: self.range.clone(),
            bit_start: self.bit_start + start,
            bit_count: stop - start,
        }
    }

    /// [BitView::slice] with an explicit step. Only a step of 1 maps onto
    /// contiguous storage; use [BitView::iter] with `step_by`/`rev` to walk bits
    /// with other strides.
    pub fn slice_step(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    ) -> Result<BitView, BitError> {
        if step != 1 {
            return Err(BitError::StridedView(step));
        }

        let start = start.map_or(Bound::Unbounded, Bound::Included);
        let stop = stop.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self.slice((start, stop)))
    }

    /// Absolute bit position of `index`, which may be negative.
    fn position(&self, index: isize) -> Result<usize, BitError> {
        let len = self.bit_count as isize;
        let resolved = if index < 0 { index + len } else { index };
        if resolved < 0 || resolved >= len {
            return Err(BitError::IndexOutOfRange {
                index,
                len: self.bit_count,
            });
        }

        Ok(self.bit_start + resolved as usize)
    }

    /// Reads one bit (0 or 1).
    pub fn read(&self, index: isize) -> Result<u8, BitError> {
        let pos = self.position(index)?;
        Ok(self.with_bits(|data| bits::read_bit_at(data, pos))?)
    }

    /// Writes one bit; any non-zero `bit` sets it.
    pub fn write(&self, index: isize, bit: u8) -> Result<(), BitError> {
        let pos = self.position(index)?;
        self.with_bits_mut(|data| bits::write_bit_at(data, pos, bit))
    }

    pub fn set_bit(&self, index: isize) -> Result<(), BitError> {
        self.write(index, 1)
    }

    pub fn clear_bit(&self, index: isize) -> Result<(), BitError> {
        self.write(index, 0)
    }

    /// Flips every addressed bit.
    pub fn invert(&self) -> Result<(), BitError> {
        self.apply_mask(|byte| !byte)
    }

    /// Sets every addressed bit to 1.
    pub fn set(&self) -> Result<(), BitError> {
        self.apply_mask(|_| 0xFF)
    }

    /// Clears every addressed bit to 0.
    pub fn clear(&self) -> Result<(), BitError> {
        self.apply_mask(|_| 0x00)
    }

    fn apply_mask(&self, op: impl Fn(u8) -> u8) -> Result<(), BitError> {
        let (start, count) = (self.bit_start, self.bit_count);
        self.with_bits_mut(|data| bits::apply_masked(data, start, count, op))
    }

    /// Overwrites addressed bits in order from `source`, stopping at whichever
    /// runs out first.
    pub fn apply<I>(&self, source: I) -> Result<(), BitError>
    where
        I: IntoIterator<Item = u8>,
    {
        self.combine(source, |_, new| new)
    }

    pub fn xor_assign<I>(&self, source: I) -> Result<(), BitError>
    where
        I: IntoIterator<Item = u8>,
    {
        self.combine(source, |old, new| old ^ new)
    }

    pub fn and_assign<I>(&self, source: I) -> Result<(), BitError>
    where
        I: IntoIterator<Item = u8>,
    {
        self.combine(source, |old, new| old & new)
    }

    pub fn or_assign<I>(&self, source: I) -> Result<(), BitError>
    where
        I: IntoIterator<Item = u8>,
    {
        self.combine(source, |old, new| old | new)
    }

    fn combine<I>(&self, source: I, op: impl Fn(u8, u8) -> u8) -> Result<(), BitError>
    where
        I: IntoIterator<Item = u8>,
    {
        // Source may be a view of this same buffer, so drain it before borrowing.
        let source: Vec<u8> = source
            .into_iter()
            .take(self.bit_count)
            .map(|bit| (bit != 0) as u8)
            .collect();

        let start = self.bit_start;
        self.with_bits_mut(|data| {
            for (i, new) in source.into_iter().enumerate() {
                let old = bits::read_bit_at(data, start + i);
                bits::write_bit_at(data, start + i, op(old, new));
            }
        })
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> Result<usize, BitError> {
        let (start, count) = (self.bit_start, self.bit_count);
        Ok(self.with_bits(|data| bits::count_ones(data, start, count))?)
    }

    /// True when at least one addressed bit is set.
    pub fn any(&self) -> Result<bool, BitError> {
        Ok(self.count_ones()? > 0)
    }

    /// Reads the addressed bits (at most 64) as an unsigned integer.
    pub fn to_int(&self, order: BitOrder) -> Result<u64, BitError> {
        let n = self.bit_count;
        if n > 64 {
            return Err(BitError::TooManyBits(n));
        }

        let start = self.bit_start;
        let value = self.with_bits(|data| bits::read_bits_at(data, start, n))?;
        Ok(match order {
            BitOrder::MsbFirst => value,
            BitOrder::LsbFirst => bits::reverse_bits_n(value, n),
        })
    }

    /// Writes `value` into the addressed bits (at most 64). Fails without
    /// writing when `value` has set bits beyond the view's width.
    pub fn from_int(&self, value: u64, order: BitOrder) -> Result<(), BitError> {
        let n = self.bit_count;
        if n > 64 {
            return Err(BitError::TooManyBits(n));
        }
        if n < 64 && value >> n != 0 {
            return Err(BitError::ValueTooWide { value, bits: n });
        }

        let value = match order {
            BitOrder::MsbFirst => value,
            BitOrder::LsbFirst => bits::reverse_bits_n(value, n),
        };
        let start = self.bit_start;
        self.with_bits_mut(|data| bits::write_bits_at(data, start, n, value))
    }

    /// Lazy iterator over the addressed bits. Each step reads the buffer, so
    /// the iterator ends early if the buffer shrinks underneath it.
    pub fn iter(&self) -> Iter {
        Iter {
            view: self.clone(),
            front: 0,
            back: self.bit_count,
        }
    }

    /// Materialized copy of the addressed bits.
    pub fn to_vec(&self) -> Result<Vec<u8>, BitError> {
        let (start, count) = (self.bit_start, self.bit_count);
        Ok(self.with_bits(|data| {
            (start..start + count)
                .map(|pos| bits::read_bit_at(data, pos))
                .collect()
        })?)
    }

    fn with_bits<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, crate::errors::AccessError> {
        self.range.with_bytes(0, self.range.len(), f)
    }

    fn with_bits_mut(&self, f: impl FnOnce(&mut [u8])) -> Result<(), BitError> {
        Ok(self.range.with_bytes_mut(0, self.range.len(), f)?)
    }
}

/// Equal when the materialized bit sequences are equal.
impl PartialEq for BitView {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_vec(), other.to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Renders the addressed bits as `0`/`1` characters.
impl fmt::Display for BitView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit == 0 { "0" } else { "1" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitView")
            .field("byte_start", &self.range.start())
            .field("bit_start", &self.bit_start)
            .field("bit_count", &self.bit_count)
            .field("bits", &format_args!("{self}"))
            .finish()
    }
}

impl<'a> IntoIterator for &'a BitView {
    type Item = u8;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Iterator returned by [BitView::iter].
#[derive(Clone)]
pub struct Iter {
    view: BitView,
    front: usize,
    back: usize,
}

impl Iter {
    fn read(&self, index: usize) -> Option<u8> {
        let pos = self.view.bit_start + index;
        self.view
            .with_bits(|data| bits::read_bit_at(data, pos))
            .ok()
    }
}

impl Iterator for Iter {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.front >= self.back {
            return None;
        }

        match self.read(self.front) {
            Some(bit) => {
                self.front += 1;
                Some(bit)
            }
            None => {
                self.front = self.back;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.back - self.front))
    }
}

impl DoubleEndedIterator for Iter {
    fn next_back(&mut self) -> Option<u8> {
        if self.front >= self.back {
            return None;
        }

        match self.read(self.back - 1) {
            Some(bit) => {
                self.back -= 1;
                Some(bit)
            }
            None => {
                self.back = self.front;
                None
            }
        }
    }
}

impl FusedIterator for Iter {}

#[cfg(test)]
mod tests {
    use crate::buffer::Buffer;

    use super::*;

    fn view(hex: &str) -> (Buffer, BitView) {
        let buffer = Buffer::from_hex(hex).unwrap();
        let bits = buffer.bits();
        (buffer, bits)
    }

    #[test]
    fn test_display_msb_first() {
        let (_, bits) = view("a501");
        assert_eq!(bits.to_string(), "1010010100000001");
        assert_eq!(bits.len(), 16);
    }

    #[test]
    fn test_slice_semantics() {
        let (_, bits) = view("0f");
        assert_eq!(bits.slice(..).to_string(), "00001111");
        assert_eq!(bits.slice(2..6).to_string(), "0011");
        assert_eq!(bits.slice(-2..).to_string(), "11");
        assert_eq!(bits.slice(..-6).to_string(), "00");
        assert_eq!(bits.slice(-100..3).to_string(), "000");
        assert_eq!(bits.slice(6..100).to_string(), "11");
        assert!(bits.slice(5..2).is_empty());
        assert!(bits.slice(9..).is_empty());
    }

    #[test]
    fn test_slice_bounds_past_the_start() {
        let (_, bits) = view("ff");
        assert!(bits.slice(..=-100).is_empty());
        assert!(bits.slice(..=-9).is_empty());
        assert_eq!(bits.slice(..=-8).to_string(), "1");
        assert_eq!(bits.slice(..=-1).len(), 8);

        assert_eq!(bits.slice((Bound::Excluded(-100), Bound::Unbounded)).len(), 8);
        assert_eq!(bits.slice((Bound::Excluded(-9), Bound::Unbounded)).len(), 8);
        assert_eq!(bits.slice((Bound::Excluded(-8), Bound::Unbounded)).len(), 7);
        assert!(bits.slice((Bound::Excluded(isize::MAX), Bound::Unbounded)).is_empty());
        assert_eq!(bits.slice(isize::MIN..=isize::MAX).len(), 8);
    }

    #[test]
    fn test_nested_slices() {
        let (_, bits) = view("00ff");
        let inner = bits.slice(4..12);
        assert_eq!(inner.to_string(), "00001111");
        assert_eq!(inner.slice(3..5).to_string(), "01");
        assert_eq!(inner.slice(3..5).bit_start(), 7);
    }

    #[test]
    fn test_slice_step() {
        let (_, bits) = view("0f");
        assert_eq!(bits.slice_step(Some(4), None, 1).unwrap().to_string(), "1111");
        assert_eq!(bits.slice_step(None, Some(-4), 1).unwrap().to_string(), "0000");
        assert_eq!(bits.slice_step(None, None, 2).unwrap_err(), BitError::StridedView(2));
        assert_eq!(bits.slice_step(None, None, -1).unwrap_err(), BitError::StridedView(-1));
    }

    #[test]
    fn test_strided_iteration() {
        let (_, bits) = view("a5");
        let evens: String = bits.iter().step_by(2).map(|b| b.to_string()).collect();
        assert_eq!(evens, "1100");
        let reversed: String = bits.iter().rev().map(|b| b.to_string()).collect();
        assert_eq!(reversed, "10100101");
    }

    #[test]
    fn test_read_write() {
        let (buffer, bits) = view("0000");
        bits.write(0, 1).unwrap();
        bits.write(-1, 1).unwrap();
        assert_eq!(buffer.to_hex(), "8001");
        assert_eq!(bits.read(0).unwrap(), 1);
        assert_eq!(bits.read(-1).unwrap(), 1);
        assert_eq!(bits.read(1).unwrap(), 0);

        bits.clear_bit(0).unwrap();
        bits.set_bit(8).unwrap();
        assert_eq!(buffer.to_hex(), "0081");
    }

    #[test]
    fn test_index_out_of_range() {
        let (_, bits) = view("00");
        assert_eq!(
            bits.read(8).unwrap_err(),
            BitError::IndexOutOfRange { index: 8, len: 8 }
        );
        assert_eq!(
            bits.write(-9, 1).unwrap_err(),
            BitError::IndexOutOfRange { index: -9, len: 8 }
        );
        assert!(bits.slice(2..4).read(2).is_err());
    }

    #[test]
    fn test_invert_partial_bytes() {
        let (buffer, bits) = view("aa55ff");
        let middle = bits.slice(3..13);

        middle.invert().unwrap();
        assert_eq!(buffer.to_vec(), vec![0b1011_0101, 0b1010_1101, 0xFF]);

        middle.invert().unwrap();
        assert_eq!(buffer.to_hex(), "aa55ff");
    }

    #[test]
    fn test_set_and_clear_partial() {
        let (buffer, bits) = view("0000");
        bits.slice(6..10).set().unwrap();
        assert_eq!(buffer.to_vec(), vec![0b0000_0011, 0b1100_0000]);

        let (buffer, bits) = view("ffff");
        bits.slice(1..3).clear().unwrap();
        assert_eq!(buffer.to_vec(), vec![0b1001_1111, 0xFF]);
    }

    #[test]
    fn test_view_over_subrange() {
        let buffer = Buffer::from_hex("00000000").unwrap();
        let bits = buffer.range(1, 2).unwrap().bits();
        bits.set().unwrap();
        assert_eq!(buffer.to_hex(), "00ffff00");
    }

    #[test]
    fn test_equality_by_content() {
        let (_, a) = view("f0");
        let (_, b) = view("0f");
        assert_eq!(a.slice(..4), b.slice(4..));
        assert_ne!(a, b);
        assert_ne!(a.slice(..4), a.slice(..3));
    }

    #[test]
    fn test_combine_ops() {
        let (buffer, bits) = view("f0");
        bits.xor_assign([1, 1, 0, 0, 1, 1, 0, 0]).unwrap();
        assert_eq!(buffer.to_vec(), vec![0b0011_1100]);

        bits.and_assign(std::iter::repeat(1).take(4)).unwrap();
        assert_eq!(buffer.to_vec(), vec![0b0011_1100]);

        bits.or_assign([1]).unwrap();
        assert_eq!(buffer.to_vec(), vec![0b1011_1100]);

        bits.slice(4..).apply([0, 1, 0, 1, 1, 1]).unwrap();
        assert_eq!(buffer.to_vec(), vec![0b1011_0101]);
    }

    #[test]
    fn test_combine_with_aliasing_view() {
        let (buffer, bits) = view("f0");
        bits.slice(4..).apply(bits.slice(..4).iter()).unwrap();
        assert_eq!(buffer.to_hex(), "ff");
    }

    #[test]
    fn test_count_and_any() {
        let (_, bits) = view("0180");
        assert_eq!(bits.count_ones().unwrap(), 2);
        assert!(bits.any().unwrap());
        assert!(!bits.slice(1..7).any().unwrap());
    }

    #[test]
    fn test_to_int_and_from_int() {
        let (buffer, bits) = view("b400");
        let field = bits.slice(0..6);
        assert_eq!(field.to_int(BitOrder::MsbFirst).unwrap(), 0b101101);
        assert_eq!(field.to_int(BitOrder::LsbFirst).unwrap(), 0b101101);

        let field = bits.slice(4..12);
        field.from_int(0x3C, BitOrder::MsbFirst).unwrap();
        assert_eq!(buffer.to_hex(), "b3c0");

        field.from_int(0b0000_0001, BitOrder::LsbFirst).unwrap();
        assert_eq!(buffer.to_hex(), "b800");

        assert_eq!(
            field.from_int(0x100, BitOrder::MsbFirst).unwrap_err(),
            BitError::ValueTooWide { value: 0x100, bits: 8 }
        );
        assert_eq!(buffer.to_hex(), "b800");

        let (_, wide) = view("000000000000000000");
        assert_eq!(wide.to_int(BitOrder::MsbFirst).unwrap_err(), BitError::TooManyBits(72));
    }

    #[test]
    fn test_shrunk_buffer() {
        let (buffer, bits) = view("ffff");
        buffer.resize(1, 0);
        assert!(matches!(bits.invert(), Err(BitError::Access(_))));
        assert_eq!(bits.iter().count(), 0);
        assert_eq!(buffer.to_hex(), "ff");
    }
}
