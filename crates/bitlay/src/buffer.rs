//! Shared, growable byte storage and aliasing ranges over it.
//!
//! A [Buffer] is a cheap-to-clone handle; every clone, [ByteRange],
//! [crate::bit_view::BitView] and [crate::field_set::FieldSet] taken from it
//! reads and writes the same bytes. Ranges do not pin the buffer's length:
//! each access re-checks the range against the buffer's current length and
//! fails with [AccessError::OutOfBounds] once the buffer has shrunk below it.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    bit_view::BitView,
    codec,
    errors::{AccessError, Error},
    field_set::FieldSet,
    layout::Layout,
    types::{ByteOrder, TypeDescriptor},
};

/// Shared handle to mutable bytes. Not thread-safe; clones alias.
#[derive(Clone, Default)]
pub struct Buffer {
    data: Rc<RefCell<Vec<u8>>>,
}

impl Buffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            data: Rc::new(RefCell::new(bytes)),
        }
    }

    /// Buffer of `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    /// Parses hex text; whitespace between digits is ignored.
    ///
    /// ```
    /// use bitlay::buffer::Buffer;
    ///
    /// let buffer = Buffer::from_hex("de ad be ef").unwrap();
    /// assert_eq!(buffer.to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
    /// ```
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Self::new(hex::decode(digits)?))
    }

    /// Lowercase hex of the current contents.
    pub fn to_hex(&self) -> String {
        hex::encode(&*self.data.borrow())
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copy of the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Grows or shrinks the buffer. Ranges that end past the new length fail on
    /// their next access.
    pub fn resize(&self, len: usize, fill: u8) {
        self.data.borrow_mut().resize(len, fill);
    }

    /// True when both handles share the same storage.
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Copies bytes `start..stop`.
    pub fn read_bytes(&self, start: usize, stop: usize) -> Result<Vec<u8>, AccessError> {
        let len = stop.saturating_sub(start);
        self.with_bytes(start, len, |bytes| bytes.to_vec())
    }

    /// Overwrites `bytes.len()` bytes at `start`; the buffer does not grow.
    pub fn write_bytes(&self, start: usize, bytes: &[u8]) -> Result<(), AccessError> {
        self.with_bytes_mut(start, bytes.len(), |dest| dest.copy_from_slice(bytes))
    }

    /// Aliasing range of `len` bytes at `start`.
    pub fn range(&self, start: usize, len: usize) -> Result<ByteRange, AccessError> {
        self.check(start, len)?;

        Ok(ByteRange {
            buffer: self.clone(),
            start,
            len,
        })
    }

    /// Aliasing range over the whole current contents.
    pub fn full_range(&self) -> ByteRange {
        ByteRange {
            buffer: self.clone(),
            start: 0,
            len: self.len(),
        }
    }

    /// Bit view over the whole current contents.
    pub fn bits(&self) -> BitView {
        self.full_range().bits()
    }

    /// Compiles `decl` and binds it at `offset`.
    ///
    /// ```
    /// use bitlay::buffer::Buffer;
    ///
    /// let buffer = Buffer::from_hex("deadbeefaabbccdd01234567").unwrap();
    /// let fields = buffer.fields("x: u32 y: u32b z: Bytes[4]", 0).unwrap();
    /// assert_eq!(fields.get("x").unwrap().as_u64(), Some(0xefbeadde));
    ///
    /// fields.set("y", 0xcafebabe_u32).unwrap();
    /// assert_eq!(buffer.to_hex(), "deadbeefcafebabe01234567");
    /// ```
    pub fn fields(&self, decl: &str, offset: usize) -> Result<FieldSet, Error> {
        let layout = Layout::parse(decl)?;
        Ok(FieldSet::bind(layout, self.full_range(), offset)?)
    }

    fn check(&self, start: usize, len: usize) -> Result<(), AccessError> {
        let available = self.len();
        match start.checked_add(len) {
            Some(end) if end <= available => Ok(()),
            _ => Err(AccessError::OutOfBounds {
                offset: start,
                len,
                available,
            }),
        }
    }

    pub(crate) fn with_bytes<R>(
        &self,
        start: usize,
        len: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, AccessError> {
        self.check(start, len)?;
        let data = self.data.borrow();
        Ok(f(&data[start..start + len]))
    }

    pub(crate) fn with_bytes_mut<R>(
        &self,
        start: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, AccessError> {
        self.check(start, len)?;
        let mut data = self.data.borrow_mut();
        Ok(f(&mut data[start..start + len]))
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer::new(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Buffer::new(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Buffer {
    fn from(bytes: [u8; N]) -> Self {
        Buffer::new(bytes.to_vec())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", self.to_hex())
    }
}

/// Aliasing window of `len` bytes at `start` in a [Buffer].
///
/// Equality compares the bytes currently in the window, not the storage.
#[derive(Clone)]
pub struct ByteRange {
    buffer: Buffer,
    start: usize,
    len: usize,
}

impl ByteRange {
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Absolute offset of the range in its buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True while the buffer is still long enough to hold the range.
    pub fn is_valid(&self) -> bool {
        self.buffer.check(self.start, self.len).is_ok()
    }

    /// Narrower range of `len` bytes at `offset` within this one.
    pub fn subrange(&self, offset: usize, len: usize) -> Result<ByteRange, AccessError> {
        self.check(offset, len)?;

        Ok(ByteRange {
            buffer: self.buffer.clone(),
            start: self.start + offset,
            len,
        })
    }

    /// Copies `len` bytes at `offset` within the range.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, AccessError> {
        self.with_bytes(offset, len, |bytes| bytes.to_vec())
    }

    /// Overwrites bytes at `offset` within the range.
    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) -> Result<(), AccessError> {
        self.with_bytes_mut(offset, bytes.len(), |dest| dest.copy_from_slice(bytes))
    }

    /// Owned copy of the range.
    pub fn to_vec(&self) -> Result<Vec<u8>, AccessError> {
        self.read_bytes(0, self.len)
    }

    pub fn bits(&self) -> BitView {
        BitView::new(self.clone())
    }

    /// Reads the whole range (1 to 8 bytes) as one integer.
    pub fn to_int(&self, order: ByteOrder, signed: bool) -> Result<i128, AccessError> {
        let ty = self.int_type(order, signed)?;
        self.with_bytes(0, self.len, |bytes| codec::decode_int(&ty, bytes))?
            .ok_or_else(|| AccessError::TooWide(self.len))
    }

    /// Writes `value` over the whole range (1 to 8 bytes). Fails without
    /// writing when `value` does not fit.
    pub fn from_int(&self, value: i128, order: ByteOrder, signed: bool) -> Result<(), AccessError> {
        let ty = self.int_type(order, signed)?;
        let mut staging = vec![0u8; self.len];
        codec::encode_int(&ty, value, &mut staging)?;
        self.write_bytes(0, &staging)
    }

    fn int_type(&self, order: ByteOrder, signed: bool) -> Result<TypeDescriptor, AccessError> {
        if self.len == 0 {
            return Err(AccessError::LengthMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if self.len > 8 {
            return Err(AccessError::TooWide(self.len));
        }

        let bits = self.len as u32 * 8;
        let ty = if signed {
            TypeDescriptor::int(bits, order)
        } else {
            TypeDescriptor::uint(bits, order)
        };
        ty.map_err(|_| AccessError::TooWide(self.len))
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), AccessError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(AccessError::OutOfBounds {
                offset,
                len,
                available: self.len,
            }),
        }
    }

    /// Runs `f` over `len` bytes at `offset`. The whole range, not just the
    /// touched part, must still fit in the buffer.
    pub(crate) fn with_bytes<R>(
        &self,
        offset: usize,
        len: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, AccessError> {
        self.check(offset, len)?;
        self.buffer.check(self.start, self.len)?;
        self.buffer.with_bytes(self.start + offset, len, f)
    }

    pub(crate) fn with_bytes_mut<R>(
        &self,
        offset: usize,
        len: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, AccessError> {
        self.check(offset, len)?;
        self.buffer.check(self.start, self.len)?;
        self.buffer.with_bytes_mut(self.start + offset, len, f)
    }
}

impl PartialEq for ByteRange {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_vec(), other.to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<[u8]> for ByteRange {
    fn eq(&self, other: &[u8]) -> bool {
        self.to_vec().is_ok_and(|bytes| bytes == other)
    }
}

impl<const N: usize> PartialEq<[u8; N]> for ByteRange {
    fn eq(&self, other: &[u8; N]) -> bool {
        self == other.as_slice()
    }
}

/// Lowercase hex of the bytes currently in the range.
impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_vec() {
            Ok(bytes) => f.write_str(&hex::encode(bytes)),
            Err(_) => f.write_str("<invalid range>"),
        }
    }
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}..{}: {self})", self.start, self.start + self.len)
    }
}
