//! The set of top-level manifest fields that get synchronized.

use indexmap::IndexSet;

/// Fields synced when the caller does not name any.
pub const DEFAULT_FIELDS: &[&str] = &[
    "keywords",
    "author",
    "repository",
    "license",
    "engines",
    "publishConfig",
];

/// Ordered set of field names.
///
/// Only these fields are ever compared or written. Insertion order decides the
/// order in which the diff enumerates fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: IndexSet<String>,
}

impl FieldSet {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new(DEFAULT_FIELDS.iter().copied())
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
