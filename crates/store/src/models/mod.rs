mod blob;
mod font;

pub use self::blob::{Blob, BlobState};
pub(crate) use self::blob::BlobRow;
pub use self::font::Font;
pub(crate) use self::font::FontRow;
