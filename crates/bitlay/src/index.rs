//! Keys accepted when looking up fields of a [crate::field_set::FieldSet].

use crate::{layout::Layout, types::TypeDescriptor};

mod private {
    pub trait Sealed {}
    impl Sealed for usize {}
    impl Sealed for str {}
    impl Sealed for String {}
    impl<T> Sealed for &T where T: ?Sized + Sealed {}
}

/// Keys accepted by [crate::field_set::FieldSet::get] and `set`: a position
/// (`usize`) or a name / dotted path (`&str`, `String`).
pub trait FieldKey: private::Sealed {
    #[doc(hidden)]
    fn locate<'a>(&self, layout: &'a Layout) -> Option<(usize, &'a TypeDescriptor)>;

    #[doc(hidden)]
    fn describe(&self) -> String;
}

impl FieldKey for usize {
    #[inline]
    fn locate<'a>(&self, layout: &'a Layout) -> Option<(usize, &'a TypeDescriptor)> {
        layout.fields().get(*self).map(|field| (field.offset, &field.ty))
    }

    fn describe(&self) -> String {
        format!("[{self}]")
    }
}

impl FieldKey for str {
    #[inline]
    fn locate<'a>(&self, layout: &'a Layout) -> Option<(usize, &'a TypeDescriptor)> {
        layout.locate(self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl FieldKey for String {
    #[inline]
    fn locate<'a>(&self, layout: &'a Layout) -> Option<(usize, &'a TypeDescriptor)> {
        layout.locate(self)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl<T> FieldKey for &T
where
    T: ?Sized + FieldKey,
{
    #[inline]
    fn locate<'a>(&self, layout: &'a Layout) -> Option<(usize, &'a TypeDescriptor)> {
        (**self).locate(layout)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
