//! # bitlay
//!
//! Live, in-place views over shared byte buffers.
//!
//! A [Buffer] is shared, growable byte storage. Two kinds of views read and
//! write it in place without ever copying:
//!
//! - [BitView] addresses individual bits (MSB-first) with slice semantics and
//!   bulk operations such as invert, set and clear.
//! - [FieldSet] binds a [Layout], compiled from a compact declaration such as
//!   `"tag: u8 len: u16b body: Bytes[4]"`, at a byte offset and exposes typed
//!   fields by name, position or dotted path.
//!
//! Every view aliases the buffer: a write through one view is visible through
//! all others, and every read decodes the current bytes.
//!
//! ## Example
//!
//! ```
//! use bitlay::{Buffer, Value};
//!
//! let buffer = Buffer::from_hex("deadbeefaabbccdd01234567").unwrap();
//! let fields = buffer.fields("x: u32 y: u32b z: Bytes[4]", 0).unwrap();
//!
//! assert_eq!(fields.get("x").unwrap(), Value::U64(0xefbeadde));
//! assert_eq!(fields.get(1).unwrap(), Value::U64(0xaabbccdd));
//!
//! fields.set("y", 0xcafebabe_u32).unwrap();
//! assert_eq!(buffer.to_hex(), "deadbeefcafebabe01234567");
//!
//! buffer.bits().slice(..8).invert().unwrap();
//! assert_eq!(buffer.to_hex(), "21adbeefcafebabe01234567");
//! ```

pub mod bit_view;
pub mod bits;
pub mod buffer;
pub mod codec;
pub mod errors;
pub mod field;
pub mod field_set;
pub mod index;
pub mod layout;
mod parser;
#[cfg(feature = "serde")]
pub mod serde;
pub mod types;
pub mod value;

pub use bit_view::BitView;
pub use buffer::{Buffer, ByteRange};
pub use errors::{AccessError, BitError, CompileError, Error};
pub use field_set::FieldSet;
pub use layout::Layout;
pub use types::{BitOrder, ByteOrder, TypeDescriptor};
pub use value::{OwnedValue, Value};

pub type Result<T, E = Error> = std::result::Result<T, E>;
