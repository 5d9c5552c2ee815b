//! Error types for the disk LRU index

use std::fmt;

#[derive(Debug)]
pub enum LruError {
    Io(Box<std::io::Error>),
    Index(String),
}

impl fmt::Display for LruError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LruError::Io(err) => write!(f, "IO error: {}", err),
            LruError::Index(msg) => write!(f, "Index error: {}", msg),
        }
    }
}

impl std::error::Error for LruError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LruError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LruError {
    fn from(err: std::io::Error) -> Self {
        LruError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for LruError {
    fn from(err: serde_json::Error) -> Self {
        LruError::Index(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LruError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_display() {
        let err = LruError::Index("truncated index file".to_string());
        assert_eq!(format!("{}", err), "Index error: truncated index file");
    }

    #[test]
    fn test_io_error_display() {
        let err = LruError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(format!("{}", err).starts_with("IO error:"));
    }
}
