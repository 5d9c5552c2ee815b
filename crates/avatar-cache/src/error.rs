//! Error types for the avatar cache

use std::fmt;

#[derive(Debug)]
pub enum AvatarError {
    /// The LRU index failed during lookup or insert. Fatal to the current
    /// request's classification pass.
    Index(disk_lru::LruError),
    /// The remote source failed. Only surfaced from simple mode, where the
    /// remote call is the whole operation.
    Remote(String),
    Io(Box<std::io::Error>),
    /// The loopback server could not be started.
    Server(String),
    /// A load was attempted after `stop()`.
    Stopped,
}

impl fmt::Display for AvatarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvatarError::Index(err) => write!(f, "Index error: {}", err),
            AvatarError::Remote(msg) => write!(f, "Remote source error: {}", msg),
            AvatarError::Io(err) => write!(f, "IO error: {}", err),
            AvatarError::Server(msg) => write!(f, "Loopback server error: {}", msg),
            AvatarError::Stopped => write!(f, "Avatar source is stopped"),
        }
    }
}

impl std::error::Error for AvatarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvatarError::Index(err) => Some(err),
            AvatarError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<disk_lru::LruError> for AvatarError {
    fn from(err: disk_lru::LruError) -> Self {
        AvatarError::Index(err)
    }
}

impl From<std::io::Error> for AvatarError {
    fn from(err: std::io::Error) -> Self {
        AvatarError::Io(Box::new(err))
    }
}

impl From<reqwest::Error> for AvatarError {
    fn from(err: reqwest::Error) -> Self {
        AvatarError::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AvatarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = AvatarError::Remote("connection refused".to_string());
        assert_eq!(
            format!("{}", err),
            "Remote source error: connection refused"
        );
    }

    #[test]
    fn test_stopped_display() {
        assert_eq!(format!("{}", AvatarError::Stopped), "Avatar source is stopped");
    }

    #[test]
    fn test_index_error_wraps_source() {
        let err = AvatarError::from(disk_lru::LruError::Index("bad".to_string()));
        assert!(format!("{}", err).contains("bad"));
    }
}
