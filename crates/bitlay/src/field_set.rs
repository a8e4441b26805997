//! Live field accessors over a buffer.
//!
//! A [FieldSet] is a [Layout] bound to a byte window. It holds no decoded
//! state: every [FieldSet::get] decodes the window's current bytes and every
//! [FieldSet::set] encodes straight into them, so two field sets bound to
//! overlapping windows always agree with each other and with the buffer.

use std::{collections::BTreeMap, fmt, rc::Rc};

#[cfg(feature = "logging")]
use tracing::trace;

use crate::{
    buffer::ByteRange,
    codec,
    errors::AccessError,
    index::FieldKey,
    layout::Layout,
    types::TypeDescriptor,
    value::{OwnedValue, Value},
};

/// A layout bound to a window of a buffer.
///
/// ```
/// use bitlay::buffer::Buffer;
/// use bitlay::field_set::FieldSet;
/// use bitlay::layout::Layout;
///
/// let buffer = Buffer::from_hex("deadbeef12345678aabb1337").unwrap();
/// let layout = Layout::parse("a: u32 b: u16 c: Bytes[6]").unwrap();
/// let fields = FieldSet::bind(layout, buffer.full_range(), 0).unwrap();
///
/// assert_eq!(fields.get("a").unwrap().as_u64(), Some(0xefbeadde));
/// assert_eq!(fields.get(1).unwrap().as_u64(), Some(0x3412));
///
/// fields.set("a", 5u32).unwrap();
/// assert_eq!(buffer.to_hex(), "0500000012345678aabb1337");
/// ```
#[derive(Clone)]
pub struct FieldSet {
    layout: Rc<Layout>,
    /// Exactly `layout.size()` bytes.
    range: ByteRange,
}

impl FieldSet {
    /// Binds `layout` to `range` starting `offset` bytes into it. Fails with
    /// [AccessError::OutOfBounds] when the layout does not fit.
    pub fn bind(
        layout: impl Into<Rc<Layout>>,
        range: ByteRange,
        offset: usize,
    ) -> Result<Self, AccessError> {
        let layout = layout.into();
        let range = range.subrange(offset, layout.size())?;
        range.with_bytes(0, range.len(), |_| ())?;

        #[cfg(feature = "logging")]
        trace!(
            "Bound {}-byte layout at buffer offset {}",
            layout.size(),
            range.start()
        );

        Ok(Self { layout, range })
    }

    /// Like [FieldSet::bind], but the layout must cover the rest of `range` exactly.
    pub fn bind_exact(
        layout: impl Into<Rc<Layout>>,
        range: ByteRange,
        offset: usize,
    ) -> Result<Self, AccessError> {
        let layout = layout.into();
        let available = range.len().saturating_sub(offset);
        if available != layout.size() {
            return Err(AccessError::LengthMismatch {
                expected: layout.size(),
                actual: available,
            });
        }

        Self::bind(layout, range, offset)
    }

    pub fn layout(&self) -> &Rc<Layout> {
        &self.layout
    }

    /// The bound window, exactly `layout().size()` bytes long.
    pub fn range(&self) -> &ByteRange {
        &self.range
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Field names in declaration order; `None` for positional-only fields.
    pub fn names(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.layout.fields().iter().map(|field| field.name.as_deref())
    }

    fn locate<K: FieldKey>(&self, key: &K) -> Result<(usize, &TypeDescriptor), AccessError> {
        key.locate(&self.layout)
            .ok_or_else(|| AccessError::NoSuchField(key.describe()))
    }

    /// Decodes the field at `key`: a position, a name, or a dotted path such
    /// as `"header.flags"` or `"items.3"`.
    pub fn get<K: FieldKey>(&self, key: K) -> Result<Value, AccessError> {
        let (offset, ty) = self.locate(&key)?;
        codec::decode(ty, &self.range, offset)
    }

    /// Encodes `value` into the field at `key`. Nothing is written unless the
    /// whole value encodes.
    pub fn set<K: FieldKey>(&self, key: K, value: impl Into<OwnedValue>) -> Result<(), AccessError> {
        let (offset, ty) = self.locate(&key)?;

        let mut staging = vec![0u8; ty.byte_size()];
        codec::encode(ty, &value.into(), &mut staging)?;

        #[cfg(feature = "logging")]
        trace!(
            "Writing {} bytes to field {} at buffer offset {}",
            staging.len(),
            key.describe(),
            self.range.start() + offset
        );

        self.range.write_bytes(offset, &staging)
    }

    /// Decodes every top-level field in order.
    pub fn values(&self) -> Result<Vec<Value>, AccessError> {
        self.layout
            .fields()
            .iter()
            .map(|field| codec::decode(&field.ty, &self.range, field.offset))
            .collect()
    }

    /// Writes one value per top-level field, in order. The count and every
    /// value are checked before anything is written.
    pub fn set_all<I>(&self, values: I) -> Result<(), AccessError>
    where
        I: IntoIterator,
        I::Item: Into<OwnedValue>,
    {
        let values = OwnedValue::List(values.into_iter().map(Into::into).collect());
        let ty = TypeDescriptor::Struct(Rc::clone(&self.layout));

        let mut staging = vec![0u8; self.layout.size()];
        codec::encode(&ty, &values, &mut staging)?;

        self.range.write_bytes(0, &staging)
    }

    /// Named fields and their current values, detached from the buffer.
    pub fn to_map(&self) -> Result<BTreeMap<String, OwnedValue>, AccessError> {
        let mut map = BTreeMap::new();

        for field in self.layout.fields() {
            if let Some(name) = &field.name {
                let value = codec::decode(&field.ty, &self.range, field.offset)?;
                map.insert(name.clone(), value.to_owned_value()?);
            }
        }

        Ok(map)
    }

    /// All field values as a positional [OwnedValue::List].
    pub fn to_owned_value(&self) -> Result<OwnedValue, AccessError> {
        let values = self
            .values()?
            .iter()
            .map(Value::to_owned_value)
            .collect::<Result<_, _>>()?;

        Ok(OwnedValue::List(values))
    }

    /// Copy of the bound bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccessError> {
        self.range.to_vec()
    }
}

/// Same layout and same current bytes.
impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        (Rc::ptr_eq(&self.layout, &other.layout) || self.layout == other.layout)
            && self.range == other.range
    }
}

/// Renders every field with its current value, one per line, nesting structs.
///
/// ```text
/// <3 fields:
///    a = 4022250974
///    [1]: 13330
///    c = bytes(5678aabb1337)
/// >
/// ```
impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<{} fields:", self.len())?;

        for (i, field) in self.layout.fields().iter().enumerate() {
            let rendered = match codec::decode(&field.ty, &self.range, field.offset) {
                Ok(value) => value.to_string(),
                Err(err) => format!("<{err}>"),
            };

            let mut lines = rendered.lines();
            let first = lines.next().unwrap_or_default();
            match &field.name {
                Some(name) => writeln!(f, "   {name} = {first}")?,
                None => writeln!(f, "   [{i}]: {first}")?,
            }
            for line in lines {
                writeln!(f, "   {line}")?;
            }
        }

        f.write_str(">")
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::Buffer;

    use super::*;

    fn bind(hex: &str, decl: &str) -> (Buffer, FieldSet) {
        let buffer = Buffer::from_hex(hex).unwrap();
        let fields = FieldSet::bind(Layout::parse(decl).unwrap(), buffer.full_range(), 0).unwrap();
        (buffer, fields)
    }

    #[test]
    fn test_read_scenario() {
        let (_, fields) = bind("deadbeef12345678aabb1337", "a: u32 b: u16 c: Bytes[6]");

        assert_eq!(fields.get("a").unwrap(), Value::U64(0xEFBEADDE));
        assert_eq!(fields.get("b").unwrap(), Value::U64(0x3412));

        let c = fields.get("c").unwrap();
        assert_eq!(c.as_bytes().unwrap().to_vec().unwrap(), hex::decode("5678aabb1337").unwrap());
    }

    #[test]
    fn test_write_scenario() {
        let (buffer, fields) = bind("deadbeef12345678aabb1337", "a: u32 b: u16 c: Bytes[6]");

        fields.set("a", 5).unwrap();
        assert_eq!(buffer.to_hex(), "0500000012345678aabb1337");
    }

    #[test]
    fn test_name_and_position_are_equivalent() {
        let (buffer, fields) = bind("0000000000", "u8 x: u32b");

        fields.set(1, 0x01020304).unwrap();
        assert_eq!(fields.get("x").unwrap(), fields.get(1).unwrap());

        fields.set("x", 7).unwrap();
        assert_eq!(fields.get(1).unwrap().as_u64(), Some(7));
        assert_eq!(buffer.to_hex(), "0000000007");
    }

    #[test]
    fn test_nested_struct() {
        let (_, fields) = bind("00000005aabbccdd", "foo: i32b bar: {a: u16 b: u16}");

        assert_eq!(fields.get("foo").unwrap(), Value::I64(5));
        assert_eq!(fields.get("bar.a").unwrap().as_u64(), Some(0xBBAA));
        assert_eq!(fields.get("bar.b").unwrap().as_u64(), Some(0xDDCC));

        let bar = fields.get("bar").unwrap();
        let bar = bar.as_struct().unwrap();
        assert_eq!(bar.get("a").unwrap().as_u64(), Some(0xBBAA));
    }

    #[test]
    fn test_nested_struct_big_endian_members() {
        let (_, fields) = bind("00000005aabbccdd", "foo: i32b bar: {a: u16b b: u16b}");

        assert_eq!(fields.get("bar.a").unwrap().as_u64(), Some(0xAABB));
        assert_eq!(fields.get("bar.b").unwrap().as_u64(), Some(0xCCDD));
    }

    #[test]
    fn test_nested_write_goes_through() {
        let (buffer, fields) = bind("00000005aabbccdd", "foo: i32b bar: {a: u16b b: u16b}");

        let bar = fields.get("bar").unwrap();
        bar.as_struct().unwrap().set("b", 0x1337).unwrap();
        assert_eq!(buffer.to_hex(), "00000005aabb1337");

        fields.set("bar.a", 0xFFFF).unwrap();
        assert_eq!(bar.as_struct().unwrap().get("a").unwrap().as_u64(), Some(0xFFFF));
    }

    #[test]
    fn test_arrays() {
        let (buffer, fields) = bind("0100020003000400", "xs: i16[4]");

        let xs = fields.get("xs").unwrap();
        let xs: Vec<i64> = xs.as_array().unwrap().iter().filter_map(Value::as_i64).collect();
        assert_eq!(xs, vec![1, 2, 3, 4]);

        fields.set("xs.2", -1).unwrap();
        assert_eq!(buffer.to_hex(), "01000200ffff0400");

        fields.set("xs", vec![OwnedValue::Int(9); 4]).unwrap();
        assert_eq!(buffer.to_hex(), "0900090009000900");
    }

    #[test]
    fn test_sign_extension_round_trip() {
        let (buffer, fields) = bind("ff", "x: i8");

        assert_eq!(fields.get("x").unwrap(), Value::I64(-1));
        fields.set("x", 0).unwrap();
        fields.set("x", -1).unwrap();
        assert_eq!(buffer.to_vec(), vec![0xFF]);
    }

    #[test]
    fn test_overflow_leaves_buffer_unchanged() {
        let (buffer, fields) = bind("aabbccdd", "x: u16 y: i8 z: u8");

        assert!(matches!(
            fields.set("x", 0x10000),
            Err(AccessError::Overflow { value: 0x10000, .. })
        ));
        assert!(fields.set("y", 128).is_err());
        assert!(fields.set("z", -1).is_err());
        assert_eq!(buffer.to_hex(), "aabbccdd");
    }

    #[test]
    fn test_failed_aggregate_write_is_atomic() {
        let (buffer, fields) = bind("00000000", "a: u8 b: u8 c: u8 d: u8");

        let result = fields.set_all([1, 2, 3, 300]);
        assert!(matches!(result, Err(AccessError::Overflow { value: 300, .. })));
        assert_eq!(buffer.to_hex(), "00000000");

        assert!(fields.set_all([1, 2, 3]).is_err());
        fields.set_all([1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.to_hex(), "01020304");
    }

    #[test]
    fn test_bytes_field() {
        let (buffer, fields) = bind("00000000", "tag: Bytes[3] u8");

        fields.set("tag", b"abc").unwrap();
        assert_eq!(buffer.to_vec(), b"abc\0".to_vec());

        assert_eq!(
            fields.set("tag", b"ab"),
            Err(AccessError::LengthMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            fields.set("tag", 1),
            Err(AccessError::TypeMismatch {
                found: "an integer",
                ty: "Bytes[3]".to_string()
            })
        );
    }

    #[test]
    fn test_bytes_value_aliases() {
        let (buffer, fields) = bind("0102", "tag: Bytes[2]");

        let tag = fields.get("tag").unwrap();
        buffer.write_bytes(0, &[0xAA]).unwrap();
        assert_eq!(*tag.as_bytes().unwrap(), [0xAAu8, 0x02]);
    }

    #[test]
    fn test_no_such_field() {
        let (_, fields) = bind("00", "a: u8");

        assert_eq!(fields.get("b"), Err(AccessError::NoSuchField("b".to_string())));
        assert_eq!(fields.get(1), Err(AccessError::NoSuchField("[1]".to_string())));
        assert!(fields.set("a.b", 1).is_err());
    }

    #[test]
    fn test_bind_bounds() {
        let buffer = Buffer::zeroed(6);
        let layout = Rc::new(Layout::parse("a: u32").unwrap());

        assert!(layout.bind(buffer.full_range(), 2).is_ok());
        assert_eq!(
            layout.bind(buffer.full_range(), 3).unwrap_err(),
            AccessError::OutOfBounds {
                offset: 3,
                len: 4,
                available: 6
            }
        );

        assert!(FieldSet::bind_exact(Rc::clone(&layout), buffer.full_range(), 2).is_ok());
        assert_eq!(
            FieldSet::bind_exact(layout, buffer.full_range(), 1).unwrap_err(),
            AccessError::LengthMismatch {
                expected: 4,
                actual: 5
            }
        );
    }

    #[test]
    fn test_access_after_shrink_fails() {
        let (buffer, fields) = bind("0102030405", "a: u8 b: u32");

        buffer.resize(3, 0);
        assert!(matches!(fields.get("b"), Err(AccessError::OutOfBounds { .. })));
        assert!(fields.set("a", 1).is_err());
        assert_eq!(buffer.to_hex(), "010203");
    }

    #[test]
    fn test_to_map_and_values() {
        let (_, fields) = bind("0102030405", "a: u8 u16b c: Bytes[2]");

        let map = fields.to_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], OwnedValue::Int(1));
        assert_eq!(map["c"], OwnedValue::Bytes(vec![4, 5]));

        let values = fields.values().unwrap();
        assert_eq!(values[1], Value::U64(0x0203));
        assert_eq!(fields.to_bytes().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(fields.names().collect::<Vec<_>>(), vec![Some("a"), None, Some("c")]);
    }

    #[test]
    fn test_display_nested() {
        let (buffer, fields) = bind("01000200aa", "a: u8 inner: { x: u16b u8 } t: Bytes[1]");

        let expected = "<3 fields:\n   a = 1\n   inner = <2 fields:\n      x = 2\n      [1]: 0\n   >\n   t = bytes(aa)\n>";
        assert_eq!(fields.to_string(), expected);

        buffer.write_bytes(0, &[9]).unwrap();
        assert!(fields.to_string().contains("a = 9"));
    }
}
