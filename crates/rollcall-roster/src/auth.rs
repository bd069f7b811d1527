//! Service-account authentication for the Google APIs.

use std::path::Path;

use gcp_access_token::json;
use thiserror::Error;

/// Read-only access to sheet data and Drive file contents.
pub const READONLY_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/drive.readonly";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("cannot read credentials file {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials file is not a service-account key: {0}")]
    InvalidKey(String),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("failed to start auth runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Exchange a service-account key for an OAuth2 access token.
///
/// The token generator is async-only, so it runs on a contained
/// current-thread runtime; everything else in the pipeline stays blocking.
pub fn access_token(credentials_file: &Path, scopes: &str) -> Result<String, AuthError> {
    let raw = std::fs::read_to_string(credentials_file).map_err(|source| AuthError::Credentials {
        path: credentials_file.display().to_string(),
        source,
    })?;

    let key = json::parse(&raw).map_err(|e| AuthError::InvalidKey(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AuthError::Runtime)?;

    let response = runtime
        .block_on(gcp_access_token::generator::init_json(&key, scopes.to_string()))
        .map_err(|e| AuthError::TokenExchange(format!("{e:?}")))?;

    match response["access_token"].as_str() {
        Some(token) if !token.is_empty() => {
            tracing::info!("service-account token minted");
            Ok(token.to_string())
        }
        _ => Err(AuthError::TokenExchange(format!(
            "no access_token in response: {response}"
        ))),
    }
}
