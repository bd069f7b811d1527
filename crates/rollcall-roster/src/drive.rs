//! Google Drive reference-photo fetcher.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

const DRIVE_FILES_BASE: &str = "https://www.googleapis.com/drive/v3/files";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("file {0} not found")]
    NotFound(String),
    #[error("no permission to read file {0}")]
    PermissionDenied(String),
    #[error("download of {file_id} returned {status}")]
    Status { file_id: String, status: u16 },
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Blocking downloader for Drive file contents (`alt=media`).
pub struct DriveFetcher {
    http: Client,
    token: String,
}

impl DriveFetcher {
    pub fn new(http: Client, token: &str) -> Self {
        Self {
            http,
            token: token.to_string(),
        }
    }

    /// Download the raw bytes of a file by id.
    pub fn fetch(&self, file_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{DRIVE_FILES_BASE}/{file_id}");
        let response = self
            .http
            .get(url)
            .query(&[("alt", "media")])
            .bearer_auth(&self.token)
            .send()?;

        classify_status(response.status(), file_id)?;

        let bytes = response.bytes()?;
        tracing::debug!(file_id, len = bytes.len(), "downloaded reference photo");
        Ok(bytes.to_vec())
    }
}

/// Map an HTTP status onto the fetch-error taxonomy.
fn classify_status(status: StatusCode, file_id: &str) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound(file_id.to_string()))
    } else if status == StatusCode::FORBIDDEN {
        Err(FetchError::PermissionDenied(file_id.to_string()))
    } else {
        Err(FetchError::Status {
            file_id: file_id.to_string(),
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status_passes() {
        assert!(classify_status(StatusCode::OK, "f").is_ok());
    }

    #[test]
    fn test_not_found_classified() {
        let err = classify_status(StatusCode::NOT_FOUND, "missing-file").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(id) if id == "missing-file"));
    }

    #[test]
    fn test_forbidden_classified() {
        let err = classify_status(StatusCode::FORBIDDEN, "locked-file").unwrap_err();
        assert!(matches!(err, FetchError::PermissionDenied(_)));
    }

    #[test]
    fn test_other_failure_keeps_status() {
        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, "f").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }
}
