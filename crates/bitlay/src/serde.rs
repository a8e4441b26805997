//! JSON-deserializable layout definitions.
//!
//! A [LayoutDef] lists fields with their types written in declaration syntax,
//! so a layout can ship as a data file and be compiled at runtime:
//!
//! ```json
//! {
//!   "fields": [
//!     { "name": "tag", "type": "u8" },
//!     { "type": "u8" },
//!     { "name": "body", "type": "{ len: u16b data: Bytes[4] }" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{errors::CompileError, layout::Layout, types::TypeDescriptor};

/// Top-level layout definition: fields in declaration order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LayoutDef {
    pub fields: Vec<FieldDef>,
}

/// One field. Unnamed fields are reachable by position only.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FieldDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type in declaration syntax, e.g. `"u16b"` or `"Bytes[6]"`.
    #[serde(rename = "type")]
    pub ty: String,
}

impl TryFrom<LayoutDef> for Layout {
    type Error = CompileError;

    fn try_from(def: LayoutDef) -> Result<Self, Self::Error> {
        let entries = def
            .fields
            .into_iter()
            .map(|field| Ok((field.name, field.ty.parse::<TypeDescriptor>()?)))
            .collect::<Result<Vec<_>, CompileError>>()?;

        Layout::compile(entries)
    }
}

impl From<&Layout> for LayoutDef {
    fn from(layout: &Layout) -> Self {
        LayoutDef {
            fields: layout
                .fields()
                .iter()
                .map(|field| FieldDef {
                    name: field.name.clone(),
                    ty: field.ty.to_string(),
                })
                .collect(),
        }
    }
}
