//! Decoding bytes into [Value]s and encoding [OwnedValue]s into bytes.
//!
//! Encoding always targets a staging slice of exactly the type's byte size;
//! callers copy it into the buffer only after the whole value encoded.

use crate::{
    bits::sign_extend,
    buffer::ByteRange,
    errors::AccessError,
    field_set::FieldSet,
    types::{ByteOrder, TypeDescriptor},
    value::{OwnedValue, Value},
};

/// Assembles up to eight bytes into an unsigned integer.
fn assemble(bytes: &[u8], order: ByteOrder) -> u64 {
    let fold = |acc: u64, byte: &u8| (acc << 8) | *byte as u64;
    match order {
        ByteOrder::Big => bytes.iter().fold(0, fold),
        ByteOrder::Little => bytes.iter().rev().fold(0, fold),
    }
}

/// Decodes an integer type from exactly `byte_size` bytes; `None` for other types.
pub fn decode_int(ty: &TypeDescriptor, bytes: &[u8]) -> Option<i128> {
    match ty {
        TypeDescriptor::UInt { order, .. } => Some(assemble(bytes, *order) as i128),
        TypeDescriptor::Int { bits, order } => {
            Some(sign_extend(assemble(bytes, *order), *bits as usize) as i128)
        }
        _ => None,
    }
}

/// Decodes the value of type `ty` at `offset` within `range`.
///
/// Byte fields and nested structs alias `range`; nothing is cached.
pub fn decode(ty: &TypeDescriptor, range: &ByteRange, offset: usize) -> Result<Value, AccessError> {
    match ty {
        TypeDescriptor::UInt { order, .. } => {
            let bytes = range.read_bytes(offset, ty.byte_size())?;
            Ok(Value::U64(assemble(&bytes, *order)))
        }
        TypeDescriptor::Int { bits, order } => {
            let bytes = range.read_bytes(offset, ty.byte_size())?;
            Ok(Value::I64(sign_extend(assemble(&bytes, *order), *bits as usize)))
        }
        TypeDescriptor::Bytes(len) => Ok(Value::Bytes(range.subrange(offset, *len)?)),
        TypeDescriptor::Array { element, count } => {
            let stride = element.byte_size();
            let mut values = Vec::with_capacity(*count);
            for i in 0..*count {
                values.push(decode(element, range, offset + i * stride)?);
            }

            Ok(Value::Array(values))
        }
        TypeDescriptor::Struct(layout) => Ok(Value::Struct(FieldSet::bind(
            layout.clone(),
            range.clone(),
            offset,
        )?)),
    }
}

/// Encodes an integer into `out`, which must be exactly `ty.byte_size()` long.
pub fn encode_int(ty: &TypeDescriptor, value: i128, out: &mut [u8]) -> Result<(), AccessError> {
    let (order, (min, max)) = match (ty, ty.int_range()) {
        (TypeDescriptor::UInt { order, .. } | TypeDescriptor::Int { order, .. }, Some(range)) => {
            (*order, range)
        }
        _ => {
            return Err(AccessError::TypeMismatch {
                found: "an integer",
                ty: ty.to_string(),
            });
        }
    };

    if value < min || value > max {
        return Err(AccessError::Overflow {
            value,
            ty: ty.to_string(),
        });
    }

    let raw = value as u64;
    let len = out.len();
    for (i, byte) in out.iter_mut().enumerate() {
        let shift = match order {
            ByteOrder::Little => i * 8,
            ByteOrder::Big => (len - 1 - i) * 8,
        };
        *byte = (raw >> shift) as u8;
    }

    Ok(())
}

/// Encodes `value` as type `ty` into `out` (exactly `ty.byte_size()` bytes).
///
/// Arrays and structs take a [OwnedValue::List] with one item per element or
/// field, or raw [OwnedValue::Bytes] of the full size.
pub fn encode(ty: &TypeDescriptor, value: &OwnedValue, out: &mut [u8]) -> Result<(), AccessError> {
    debug_assert_eq!(out.len(), ty.byte_size());

    match (ty, value) {
        (TypeDescriptor::UInt { .. } | TypeDescriptor::Int { .. }, OwnedValue::Int(v)) => {
            encode_int(ty, *v, out)
        }
        (
            TypeDescriptor::Bytes(_) | TypeDescriptor::Array { .. } | TypeDescriptor::Struct(_),
            OwnedValue::Bytes(bytes),
        ) => {
            if bytes.len() != out.len() {
                return Err(AccessError::LengthMismatch {
                    expected: out.len(),
                    actual: bytes.len(),
                });
            }
            out.copy_from_slice(bytes);
            Ok(())
        }
        (TypeDescriptor::Array { element, count }, OwnedValue::List(items)) => {
            if items.len() != *count {
                return Err(AccessError::LengthMismatch {
                    expected: *count,
                    actual: items.len(),
                });
            }

            let stride = element.byte_size();
            for (i, item) in items.iter().enumerate() {
                encode(element, item, &mut out[i * stride..(i + 1) * stride])?;
            }
            Ok(())
        }
        (TypeDescriptor::Struct(layout), OwnedValue::List(items)) => {
            if items.len() != layout.len() {
                return Err(AccessError::LengthMismatch {
                    expected: layout.len(),
                    actual: items.len(),
                });
            }

            for (field, item) in layout.fields().iter().zip(items) {
                encode(&field.ty, item, &mut out[field.offset..field.end()])?;
            }
            Ok(())
        }
        _ => Err(AccessError::TypeMismatch {
            found: value.kind(),
            ty: ty.to_string(),
        }),
    }
}
