//! rollcall-roster — Google collaborators for the known-face registry.
//!
//! Service-account auth, the Sheets roster source, and the Drive photo
//! fetcher. All network calls are blocking; the registry build is a
//! sequential, single-threaded pass.

pub mod auth;
pub mod drive;
pub mod sheets;

pub use auth::{access_token, AuthError, READONLY_SCOPES};
pub use drive::{DriveFetcher, FetchError};
pub use sheets::{ColumnMap, RosterError, SheetsClient};
