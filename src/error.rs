//! CLI Error Types

use derive_more::{Display, Error};

/// A command-line error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command-line operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("cannot load configuration")]
    Config,
    #[display("cannot open the font registry")]
    Open,
    #[display("command failed: {_0}")]
    Command(#[error(not(source))] &'static str),
}

/// `err` followed by its causes, one per level, on a single line.
///
/// Each level contributes the first cause it was raised from, so the line ends
/// with whatever failed first (the missing file, the refused connection).
pub fn one_line(err: &Error) -> String {
    let mut frame = err.frame();
    let mut parts = vec![frame.error().to_string()];
    while let Some(child) = frame.children().first() {
        frame = child;
        let message = frame.error().to_string();
        if parts.last() != Some(&message) {
            parts.push(message);
        }
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;
    use fontlib_registry::error::ErrorKind as RegistryErrorKind;

    #[test]
    fn test_one_line_includes_cause() {
        let err = exn::Exn::from(RegistryErrorKind::FontNotFound("Nope".to_string())).raise(ErrorKind::Command("save"));
        assert_eq!(one_line(&err), "command failed: save: no font with id or name Nope");
    }

    #[test]
    fn test_one_line_reaches_foreign_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "fonts.toml missing");
        let err = Err::<(), _>(io).or_raise(|| ErrorKind::Config).unwrap_err();
        assert_eq!(one_line(&err), "cannot load configuration: fonts.toml missing");
    }

    #[test]
    fn test_one_line_without_cause() {
        assert_eq!(one_line(&exn::Exn::from(ErrorKind::Open)), "cannot open the font registry");
    }
}
