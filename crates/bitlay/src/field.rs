//! Compiled field entries of a [crate::layout::Layout].

use crate::types::TypeDescriptor;

/// A single field of a layout: optional name, type and resolved byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// `None` for positional-only fields.
    pub name: Option<String>,
    pub ty: TypeDescriptor,
    /// Byte offset from the start of the enclosing struct.
    pub offset: usize,
}

impl FieldSpec {
    pub fn byte_size(&self) -> usize {
        self.ty.byte_size()
    }

    /// Byte offset one past the end of the field.
    pub fn end(&self) -> usize {
        self.offset + self.byte_size()
    }
}
