//! Error types for layout compilation, buffer access and bit views.

use thiserror::Error;

/// Errors produced when compiling a declaration into a [crate::layout::Layout].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The declaration text is malformed. `position` is a byte offset into the text.
    #[error("syntax error at {position}: {message} (near {token:?})")]
    Syntax {
        message: &'static str,
        token: String,
        position: usize,
    },
    /// Two sibling fields share a name.
    #[error("field `{0}` is declared more than once")]
    DuplicateName(String),
    /// Unknown type name, an integer width that is not a multiple of 8 in
    /// `8..=64`, or an array of zero-size elements.
    #[error("unsupported type `{0}`")]
    UnsupportedType(String),
    /// Array declared with zero elements.
    #[error("array of `{0}` has zero elements")]
    InvalidArrayCount(String),
    /// A struct (top-level or nested) declares no fields.
    #[error("layout declares no fields")]
    EmptyLayout,
    /// The declared size does not fit in `usize`.
    #[error("size of `{0}` overflows")]
    SizeOverflow(String),
}

/// Errors produced when reading or writing bytes through a range or a field set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The requested byte range is beyond the end of the data.
    #[error("range {offset}..{} exceeds {available} available bytes", .offset + .len)]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
    /// An integer does not fit the field's width and signedness.
    #[error("value {value} does not fit in `{ty}`")]
    Overflow { value: i128, ty: String },
    /// The assigned value has the wrong shape for the field.
    #[error("cannot assign {found} to a field of type `{ty}`")]
    TypeMismatch { found: &'static str, ty: String },
    /// Byte string or element list has the wrong length.
    #[error("expected {expected} items, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// Integer conversion requested over more than eight bytes.
    #[error("{0} bytes do not fit in a 64-bit integer")]
    TooWide(usize),
    /// No field matches the given name, path or position.
    #[error("no field `{0}`")]
    NoSuchField(String),
}

/// Errors produced by [crate::bit_view::BitView] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("bit index {index} out of range for {len} bits")]
    IndexOutOfRange { index: isize, len: usize },
    /// Only contiguous (step 1) views can alias storage.
    #[error("step {0} cannot produce a contiguous view")]
    StridedView(isize),
    /// More than 64 bits were requested as a single integer.
    #[error("{0} bits do not fit in a 64-bit integer")]
    TooManyBits(usize),
    /// The integer has set bits above the view's width.
    #[error("value {value:#x} does not fit in {bits} bits")]
    ValueTooWide { value: u64, bits: usize },
    /// The underlying byte range is no longer valid.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Umbrella error for entry points that both compile and bind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Bit(#[from] BitError),
}
