//! SKU classification and page grouping.
//!
//! Region text is reduced to an optional [`Sku`] per page, and the
//! per-page results are folded into [`PageGroups`] with carry-forward.

pub mod classifier;
pub mod grouping;

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

/// A product identifier read from a label page. Opaque beyond its length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn new_unchecked(value: impl Into<String>) -> Self {
        Sku(value.into())
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Sku {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Key of one output document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Sku(Sku),
    /// Pages seen before the first valid SKU.
    Unidentified,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Sku(sku) => write!(f, "{sku}"),
            GroupKey::Unidentified => f.write_str("<unidentified>"),
        }
    }
}
