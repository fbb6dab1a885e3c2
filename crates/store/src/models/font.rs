use crate::error::{Error, ErrorKind};
use crate::identity_of;
use exn::ResultExt;
use std::collections::BTreeSet;

/// A font resource, identified by the URL it is served from.
///
/// Fonts are never removed. Seeing the same origin again under a different
/// family name adds an alias instead of a second font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    /// See [`identity_of`].
    pub id: String,
    pub origin: String,
    /// The first family name this origin was seen with.
    pub name: String,
    /// Every other family name, in the order they were seen.
    pub aliases: Vec<String>,
    pub src_formats: BTreeSet<String>,
    pub unicode_range: Option<String>,
}

impl Font {
    pub fn new(origin: impl Into<String>, name: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            id: identity_of(&origin),
            origin,
            name: name.into(),
            aliases: Vec::new(),
            src_formats: BTreeSet::new(),
            unicode_range: None,
        }
    }

    pub fn with_format(mut self, format: Option<impl Into<String>>) -> Self {
        self.src_formats.extend(format.map(Into::into));
        self
    }

    pub fn with_unicode_range(mut self, range: Option<impl Into<String>>) -> Self {
        self.unicode_range = range.map(Into::into);
        self
    }

    /// Is `name` the primary name or one of the aliases?
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Record `name` as an alias. Returns `false` if the font already
    /// answers to that name.
    pub fn add_alias(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.is_named(&name) {
            return false;
        }
        self.aliases.push(name);
        true
    }

    /// Merge format tags into this font. Returns `true` if any were new.
    pub fn merge_formats<'a>(&mut self, formats: impl IntoIterator<Item = &'a String>) -> bool {
        let before = self.src_formats.len();
        self.src_formats.extend(formats.into_iter().cloned());
        self.src_formats.len() != before
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FontRow {
    pub(crate) id: String,
    pub(crate) origin: String,
    pub(crate) name: String,
    pub(crate) aliases: String,
    pub(crate) src_formats: String,
    pub(crate) unicode_range: Option<String>,
}
impl TryFrom<&Font> for FontRow {
    type Error = Error;
    fn try_from(font: &Font) -> Result<Self, Self::Error> {
        Ok(Self {
            id: font.id.clone(),
            origin: font.origin.clone(),
            name: font.name.clone(),
            aliases: serde_json::to_string(&font.aliases).or_raise(|| ErrorKind::InvalidData("aliases"))?,
            src_formats: serde_json::to_string(&font.src_formats).or_raise(|| ErrorKind::InvalidData("src formats"))?,
            unicode_range: font.unicode_range.clone(),
        })
    }
}
impl TryFrom<FontRow> for Font {
    type Error = Error;
    fn try_from(row: FontRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            origin: row.origin,
            name: row.name,
            aliases: serde_json::from_str(&row.aliases).or_raise(|| ErrorKind::InvalidData("aliases"))?,
            src_formats: serde_json::from_str(&row.src_formats).or_raise(|| ErrorKind::InvalidData("src formats"))?,
            unicode_range: row.unicode_range,
        })
    }
}
