//! Error types for the qBittorrent WebUI client.

use thiserror::Error;

/// Failures raised while talking to the qBittorrent WebUI API.
#[derive(Debug, Error)]
pub enum QBittorrentError {
    /// Transport or decoding failure.
    #[error("qbittorrent http request failed")]
    Http(#[from] reqwest::Error),
    /// Login was rejected.
    #[error("qbittorrent authentication failed")]
    Auth {
        /// Detail reported by the WebUI.
        detail: String,
    },
    /// The WebUI answered with a non-success status.
    #[error("qbittorrent api error")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },
}

impl QBittorrentError {
    /// Whether the error is an authorisation rejection that a fresh login may fix.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Api { status_code: 403, .. })
    }
}

/// Result alias for qBittorrent client calls.
pub type Result<T> = std::result::Result<T, QBittorrentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_detected_by_status() {
        let forbidden = QBittorrentError::Api {
            status_code: 403,
            message: "Forbidden".to_string(),
        };
        assert!(forbidden.is_forbidden());
        assert_eq!(forbidden.to_string(), "qbittorrent api error");

        let missing = QBittorrentError::Api {
            status_code: 404,
            message: String::new(),
        };
        assert!(!missing.is_forbidden());
        assert!(
            !QBittorrentError::Auth {
                detail: "Fails.".to_string()
            }
            .is_forbidden()
        );
    }
}
