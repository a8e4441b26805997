//! Layout: compiled, ordered set of fields with resolved byte offsets.

use std::{collections::BTreeMap, fmt, rc::Rc, str::FromStr};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::{
    buffer::ByteRange,
    errors::{AccessError, CompileError},
    field::FieldSpec,
    field_set::FieldSet,
    types::TypeDescriptor,
};

/// A compiled layout. Use [Layout::parse] to build one from declaration text or
/// [Layout::compile] from typed entries, then [Layout::bind] it to a buffer.
///
/// A layout is immutable and carries no buffer; the same layout can be bound to
/// any number of buffers large enough to hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<FieldSpec>,
    names: BTreeMap<String, usize>,
    size: usize,
}

impl Layout {
    /// Compiles declaration text such as `"a: u32 b: u16 c: Bytes[6]"`.
    ///
    /// ```
    /// use bitlay::layout::Layout;
    ///
    /// let layout = Layout::parse("foo: i32b bar: { a: u16 b: u16 }").unwrap();
    /// assert_eq!(layout.size(), 8);
    /// assert_eq!(layout.offset_of("bar.b"), Some(6));
    /// ```
    pub fn parse(decl: &str) -> Result<Self, CompileError> {
        crate::parser::parse_layout(decl)
    }

    /// Compiles `(name, type)` entries, assigning offsets in declaration order.
    /// Fails on an empty entry list or duplicate names.
    pub fn compile<I>(entries: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = (Option<String>, TypeDescriptor)>,
    {
        let mut fields = Vec::new();
        let mut names = BTreeMap::new();
        let mut size = 0usize;

        for (name, ty) in entries {
            if let Some(name) = &name {
                if names.insert(name.clone(), fields.len()).is_some() {
                    return Err(CompileError::DuplicateName(name.clone()));
                }
            }

            size = match size.checked_add(ty.byte_size()) {
                Some(end) => end,
                None => return Err(CompileError::SizeOverflow(ty.to_string())),
            };
            fields.push(FieldSpec {
                name,
                offset: size - ty.byte_size(),
                ty,
            });
        }

        if fields.is_empty() {
            return Err(CompileError::EmptyLayout);
        }

        #[cfg(feature = "logging")]
        debug!("Compiled layout with {} fields, {} bytes", fields.len(), size);

        Ok(Self {
            fields,
            names,
            size,
        })
    }

    /// Total byte size of the layout.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Position of the top-level field called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Field by name, or by position when `key` is a decimal number.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        match self.position(key) {
            Some(index) => self.fields.get(index),
            None => key
                .parse::<usize>()
                .ok()
                .and_then(|index| self.fields.get(index)),
        }
    }

    /// Resolves a dotted path (`"bar.a"`, `"items.2"`, `"1.0"`) into the
    /// offset relative to this layout and the type at that offset.
    ///
    /// Segments after the first step into nested structs by name or position
    /// and into arrays by element index.
    pub fn locate(&self, path: &str) -> Option<(usize, &TypeDescriptor)> {
        let mut segments = path.split('.');
        let field = self.field(segments.next()?)?;

        let mut offset = field.offset;
        let mut ty = &field.ty;

        for segment in segments {
            match ty {
                TypeDescriptor::Struct(inner) => {
                    let field = inner.field(segment)?;
                    offset += field.offset;
                    ty = &field.ty;
                }
                TypeDescriptor::Array { element, count } => {
                    let index = segment.parse::<usize>().ok().filter(|i| i < count)?;
                    offset += index * element.byte_size();
                    ty = element.as_ref();
                }
                _ => return None,
            }
        }

        Some((offset, ty))
    }

    /// Offset of the field at `path` relative to the start of the layout.
    pub fn offset_of(&self, path: &str) -> Option<usize> {
        self.locate(path).map(|(offset, _)| offset)
    }

    /// Binds this layout to `range` at `offset`. See [FieldSet::bind].
    pub fn bind(self: &Rc<Self>, range: ByteRange, offset: usize) -> Result<FieldSet, AccessError> {
        FieldSet::bind(Rc::clone(self), range, offset)
    }
}

/// Renders the layout back into declaration syntax.
impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if let Some(name) = &field.name {
                write!(f, "{name}: ")?;
            }
            write!(f, "{}", field.ty)?;
        }

        Ok(())
    }
}

impl FromStr for Layout {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::parse(s)
    }
}
