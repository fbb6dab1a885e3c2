//! `@font-face` extraction from stylesheets.
//!
//! Stylesheets are tokenized with [`cssparser`] into an owned [`Token`] tree.
//! Only at-rules are kept; each `@font-face` body is split into declarations
//! and interpreted into a [`FontFaceRecord`]. Parsing is deliberately
//! forgiving: a rule missing `font-family` or `src` still produces a record
//! (with empty fields) and never stops the rules after it from being read.

mod declaration;
mod fontface;
mod stylesheet;
mod token;

pub use crate::declaration::{Accumulator, Declarations, Src, split_declarations};
pub use crate::fontface::{FontFaceRecord, resolve_url};
pub use crate::stylesheet::{AtRule, Stylesheet};
pub use crate::token::{Token, TokenKind};
use tracing::instrument;

/// At-rule keyword of font face declarations.
pub const FONT_FACE: &str = "font-face";

/// Read every `@font-face` rule from `bytes`, resolving relative `src` URLs
/// against `stylesheet_url`.
#[instrument(skip(bytes), fields(size = bytes.as_ref().len()))]
pub fn font_faces(bytes: impl AsRef<[u8]>, stylesheet_url: &str) -> Vec<FontFaceRecord> {
    let sheet = Stylesheet::parse(bytes.as_ref());
    let records: Vec<_> =
        sheet.at_rules(FONT_FACE).map(|rule| FontFaceRecord::from_rule(rule, stylesheet_url)).collect();
    tracing::debug!(count = records.len(), "parsed @font-face rules");
    records
}
