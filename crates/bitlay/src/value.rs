//! Values produced by reading fields and accepted when writing them.

use std::fmt;

use crate::{buffer::ByteRange, errors::AccessError, field_set::FieldSet};

/// A decoded field value.
///
/// `Bytes` and `Struct` alias the buffer they were read from; reading through
/// them later observes later writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U64(u64),
    I64(i64),
    Bytes(ByteRange),
    Array(Vec<Value>),
    Struct(FieldSet),
}

impl Value {
    /// Integer value as `u64`, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            Value::I64(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Integer value as `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U64(v) => i64::try_from(*v).ok(),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::U64(v) => Some(*v as i128),
            Value::I64(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&ByteRange> {
        match self {
            Value::Bytes(range) => Some(range),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&FieldSet> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Detached copy. Byte ranges are copied out; structs become positional lists.
    pub fn to_owned_value(&self) -> Result<OwnedValue, AccessError> {
        Ok(match self {
            Value::U64(v) => OwnedValue::Int(*v as i128),
            Value::I64(v) => OwnedValue::Int(*v as i128),
            Value::Bytes(range) => OwnedValue::Bytes(range.to_vec()?),
            Value::Array(values) => OwnedValue::List(
                values
                    .iter()
                    .map(Value::to_owned_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Struct(fields) => fields.to_owned_value()?,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::Bytes(range) => write!(f, "bytes({range})"),
            Value::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Value::Struct(fields) => write!(f, "{fields}"),
        }
    }
}

/// An owned value, detached from any buffer. Used as input for writes.
///
/// Integers of any Rust width convert into [OwnedValue::Int]; byte containers
/// into [OwnedValue::Bytes].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedValue {
    Int(i128),
    Bytes(Vec<u8>),
    /// Array elements or struct fields in declaration order.
    List(Vec<OwnedValue>),
}

impl OwnedValue {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            OwnedValue::Int(_) => "an integer",
            OwnedValue::Bytes(_) => "bytes",
            OwnedValue::List(_) => "a list",
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            OwnedValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for OwnedValue {
                fn from(value: $t) -> Self {
                    OwnedValue::Int(value as i128)
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, i128);

impl From<Vec<u8>> for OwnedValue {
    fn from(value: Vec<u8>) -> Self {
        OwnedValue::Bytes(value)
    }
}

impl From<&[u8]> for OwnedValue {
    fn from(value: &[u8]) -> Self {
        OwnedValue::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for OwnedValue {
    fn from(value: [u8; N]) -> Self {
        OwnedValue::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for OwnedValue {
    fn from(value: &[u8; N]) -> Self {
        OwnedValue::Bytes(value.to_vec())
    }
}

impl From<Vec<OwnedValue>> for OwnedValue {
    fn from(value: Vec<OwnedValue>) -> Self {
        OwnedValue::List(value)
    }
}
