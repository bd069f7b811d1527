//! Registry-build orchestration: auth, roster fetch, photo downloads,
//! embedding.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use rollcall_core::{build_registry, BuildReport, Embedding, FaceAnalyzer, KnownFaceRegistry, RosterRow};
use rollcall_roster::{access_token, DriveFetcher, SheetsClient, READONLY_SCOPES};

use crate::config::Config;

/// Bound per-request time so a stalled download cannot hang the build.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated connection to the Google APIs. Connection or auth
/// failure here is fatal for the build step — the live loop never starts.
pub struct RosterSession {
    http: Client,
    token: String,
}

impl RosterSession {
    pub fn connect(config: &Config) -> Result<Self> {
        let token = access_token(&config.auth.credentials_file, READONLY_SCOPES)
            .context("Google API authentication failed")?;
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, token })
    }

    /// Fetch the configured worksheet as roster rows.
    pub fn fetch_rows(&self, config: &Config) -> Result<Vec<RosterRow>> {
        let sheets = SheetsClient::new(self.http.clone(), &self.token);

        let spreadsheet_id = match (&config.roster.sheet_id, &config.roster.sheet_name) {
            (Some(id), _) if !id.trim().is_empty() => id.trim().to_string(),
            (_, Some(name)) => sheets
                .resolve_spreadsheet_id(name)
                .with_context(|| format!("resolving spreadsheet {name:?}"))?,
            _ => anyhow::bail!("neither sheet_id nor sheet_name is configured"),
        };

        let rows = sheets
            .get_rows(&spreadsheet_id, &config.roster.worksheet, &config.column_map())
            .context("reading roster sheet")?;
        tracing::info!(
            rows = rows.len(),
            worksheet = %config.roster.worksheet,
            "roster fetched"
        );
        Ok(rows)
    }

    pub fn drive(&self) -> DriveFetcher {
        DriveFetcher::new(self.http.clone(), &self.token)
    }
}

/// Download each roster photo and build the known-face registry.
///
/// Per-row failures are handled inside the builder; only the roster fetch
/// itself can fail here.
pub fn build_known_faces<A: FaceAnalyzer>(
    session: &RosterSession,
    config: &Config,
    analyzer: &mut A,
) -> Result<(KnownFaceRegistry, BuildReport)> {
    let rows = session.fetch_rows(config)?;
    let drive = session.drive();

    let (registry, report) = build_registry(
        &rows,
        |file_id| drive.fetch(file_id),
        |bytes| embed_photo(analyzer, bytes),
    );

    tracing::info!(
        loaded = report.loaded,
        skipped = report.skipped(),
        "known-face registry built"
    );
    Ok((registry, report))
}

/// Decode a downloaded reference photo and embed every face in it. The
/// builder keeps only the first embedding.
fn embed_photo<A: FaceAnalyzer>(analyzer: &mut A, bytes: &[u8]) -> Result<Vec<Embedding>> {
    let image = image::load_from_memory(bytes)
        .context("reference photo is not a decodable image")?
        .to_rgb8();
    let faces = analyzer.analyze(&image)?;
    Ok(faces.into_iter().map(|face| face.embedding).collect())
}
