//! Type descriptors: the static binary layout of a single field.

use std::{fmt, rc::Rc, str::FromStr};

use crate::{errors::CompileError, layout::Layout};

/// Byte order of a multi-byte integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Bit order used when a run of bits is read or written as one integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitOrder {
    /// The first addressed bit is the most significant.
    #[default]
    MsbFirst,
    /// The first addressed bit is the least significant.
    LsbFirst,
}

/// Layout of one field. Sizes are always static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Unsigned integer of `bits` width (8, 16, ..., 64).
    UInt { bits: u32, order: ByteOrder },
    /// Two's complement signed integer of `bits` width.
    Int { bits: u32, order: ByteOrder },
    /// Raw bytes, decoded as an aliasing range.
    Bytes(usize),
    /// `count` consecutive elements of the same type.
    Array {
        element: Box<TypeDescriptor>,
        count: usize,
    },
    /// Nested structure.
    Struct(Rc<Layout>),
}

impl TypeDescriptor {
    /// Unsigned integer type. `bits` must be a multiple of 8 in `8..=64`.
    pub fn uint(bits: u32, order: ByteOrder) -> Result<Self, CompileError> {
        check_width(bits, 'u', order)?;
        Ok(TypeDescriptor::UInt { bits, order })
    }

    /// Signed integer type. `bits` must be a multiple of 8 in `8..=64`.
    pub fn int(bits: u32, order: ByteOrder) -> Result<Self, CompileError> {
        check_width(bits, 'i', order)?;
        Ok(TypeDescriptor::Int { bits, order })
    }

    pub fn bytes(len: usize) -> Self {
        TypeDescriptor::Bytes(len)
    }

    /// Array of `count` elements. Fails when `count` is zero, the element
    /// occupies no bytes, or the total size overflows.
    pub fn array(element: TypeDescriptor, count: usize) -> Result<Self, CompileError> {
        if count == 0 {
            return Err(CompileError::InvalidArrayCount(element.to_string()));
        }
        if element.byte_size() == 0 {
            return Err(CompileError::UnsupportedType(format!("{element}[{count}]")));
        }
        if element.byte_size().checked_mul(count).is_none() {
            return Err(CompileError::SizeOverflow(format!("{element}[{count}]")));
        }

        Ok(TypeDescriptor::Array {
            element: Box::new(element),
            count,
        })
    }

    pub fn structure(layout: impl Into<Rc<Layout>>) -> Self {
        TypeDescriptor::Struct(layout.into())
    }

    /// Number of bytes occupied by a value of this type.
    pub fn byte_size(&self) -> usize {
        match self {
            TypeDescriptor::UInt { bits, .. } | TypeDescriptor::Int { bits, .. } => {
                *bits as usize / 8
            }
            TypeDescriptor::Bytes(len) => *len,
            TypeDescriptor::Array { element, count } => element.byte_size().saturating_mul(*count),
            TypeDescriptor::Struct(layout) => layout.size(),
        }
    }

    /// Inclusive range of integers representable by this type, or `None` for non-integers.
    pub fn int_range(&self) -> Option<(i128, i128)> {
        match self {
            TypeDescriptor::UInt { bits, .. } => Some((0, (1i128 << bits) - 1)),
            TypeDescriptor::Int { bits, .. } => {
                let half = 1i128 << (bits - 1);
                Some((-half, half - 1))
            }
            _ => None,
        }
    }
}

fn check_width(bits: u32, prefix: char, order: ByteOrder) -> Result<(), CompileError> {
    if bits == 0 || bits % 8 != 0 || bits > 64 {
        let suffix = if order == ByteOrder::Big { "b" } else { "" };
        return Err(CompileError::UnsupportedType(format!(
            "{prefix}{bits}{suffix}"
        )));
    }

    Ok(())
}

/// Renders the declaration syntax for the type, e.g. `u32b`, `Bytes[6]`, `i16[2]`.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = |order: &ByteOrder| match order {
            ByteOrder::Little => "",
            ByteOrder::Big => "b",
        };

        match self {
            TypeDescriptor::UInt { bits, order } => write!(f, "u{bits}{}", suffix(order)),
            TypeDescriptor::Int { bits, order } => write!(f, "i{bits}{}", suffix(order)),
            TypeDescriptor::Bytes(len) => write!(f, "Bytes[{len}]"),
            TypeDescriptor::Array { element, count } => write!(f, "{element}[{count}]"),
            TypeDescriptor::Struct(layout) => write!(f, "{{ {layout} }}"),
        }
    }
}

/// Parses a single type in declaration syntax, e.g. `"u16b"` or `"{ a: u8 b: u8 }[2]"`.
impl FromStr for TypeDescriptor {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_type(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size() {
        let u32b = TypeDescriptor::uint(32, ByteOrder::Big).unwrap();
        assert_eq!(u32b.byte_size(), 4);

        let array = TypeDescriptor::array(u32b, 3).unwrap();
        assert_eq!(array.byte_size(), 12);

        assert_eq!(TypeDescriptor::bytes(6).byte_size(), 6);
    }

    #[test]
    fn test_unsupported_widths() {
        assert_eq!(
            TypeDescriptor::uint(12, ByteOrder::Little).unwrap_err(),
            CompileError::UnsupportedType("u12".to_string())
        );
        assert_eq!(
            TypeDescriptor::int(128, ByteOrder::Big).unwrap_err(),
            CompileError::UnsupportedType("i128b".to_string())
        );
        assert!(TypeDescriptor::uint(0, ByteOrder::Little).is_err());
    }

    #[test]
    fn test_zero_count_array() {
        let element = TypeDescriptor::uint(8, ByteOrder::Little).unwrap();
        assert_eq!(
            TypeDescriptor::array(element, 0).unwrap_err(),
            CompileError::InvalidArrayCount("u8".to_string())
        );
    }

    #[test]
    fn test_zero_size_element_array() {
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::bytes(0), usize::MAX).unwrap_err(),
            CompileError::UnsupportedType(format!("Bytes[0][{}]", usize::MAX))
        );
        assert!(TypeDescriptor::array(TypeDescriptor::bytes(1), 3).is_ok());
    }

    #[test]
    fn test_array_size_overflow() {
        let element = TypeDescriptor::uint(64, ByteOrder::Little).unwrap();
        assert_eq!(
            TypeDescriptor::array(element, usize::MAX / 4).unwrap_err(),
            CompileError::SizeOverflow(format!("u64[{}]", usize::MAX / 4))
        );

        assert_eq!(
            Layout::compile([
                (None, TypeDescriptor::bytes(usize::MAX)),
                (None, TypeDescriptor::bytes(1)),
            ]),
            Err(CompileError::SizeOverflow("Bytes[1]".to_string()))
        );
    }

    #[test]
    fn test_int_range() {
        let i8 = TypeDescriptor::int(8, ByteOrder::Little).unwrap();
        assert_eq!(i8.int_range(), Some((-128, 127)));

        let u64 = TypeDescriptor::uint(64, ByteOrder::Little).unwrap();
        assert_eq!(u64.int_range(), Some((0, u64::MAX as i128)));

        assert_eq!(TypeDescriptor::bytes(2).int_range(), None);
    }

    #[test]
    fn test_display() {
        let element = TypeDescriptor::int(16, ByteOrder::Big).unwrap();
        let array = TypeDescriptor::array(element, 2).unwrap();
        assert_eq!(array.to_string(), "i16b[2]");
        assert_eq!(TypeDescriptor::bytes(6).to_string(), "Bytes[6]");
    }
}
