//! Deduplicated font registry.
//!
//! Fonts are identified by the URL their bytes are served from, see
//! [`identity_of`](fontlib_store::identity_of). They come from three kinds of
//! sources, loaded in this order by [`Registry::init_stack`]:
//!
//! 1. stylesheets bundled into the binary ([`Builtins`]),
//! 2. plugin sources listing local font files,
//! 3. remote stylesheets, including the Google Fonts API.
//!
//! The first name an origin is seen with stays its name; every other name
//! becomes an alias.

mod builtins;
mod entry_point;
pub mod error;
mod google;
mod registry;

pub use crate::builtins::Builtins;
pub use crate::entry_point::{file_url, format_of};
pub use crate::google::{GOOGLE_FONTS_GSTATIC, GOOGLE_FONTS_HOST, is_google_font_url, user_agent};
pub use crate::registry::Registry;
