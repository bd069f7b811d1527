//! Google Sheets roster source.
//!
//! Fetches the worksheet over the Sheets v4 values endpoint and maps rows
//! through a configured column-name mapping into [`RosterRow`]s.

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use rollcall_core::RosterRow;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_BASE: &str = "https://www.googleapis.com/drive/v3/files";

/// Header names expected in row 1 of the worksheet. `name` and `image_url`
/// drive the registry; the rest are optional metadata columns. Every
/// configured header must exist in the sheet.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub name: String,
    pub image_url: String,
    pub gender: Option<String>,
    pub college: Option<String>,
    pub studying: Option<String>,
    pub branch: Option<String>,
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("roster request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("roster source returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("missing columns in roster header: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("no spreadsheet named {0:?} is visible to the service account")]
    SpreadsheetNotFound(String),
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    id: String,
}

/// Blocking client for the roster spreadsheet.
pub struct SheetsClient {
    http: Client,
    token: String,
}

impl SheetsClient {
    pub fn new(http: Client, token: &str) -> Self {
        Self {
            http,
            token: token.to_string(),
        }
    }

    /// Fetch all rows of the worksheet and map them through `columns`.
    ///
    /// A worksheet with a header but no data rows is an empty roster, not
    /// an error. A header missing any configured column is fatal.
    pub fn get_rows(
        &self,
        spreadsheet_id: &str,
        worksheet: &str,
        columns: &ColumnMap,
    ) -> Result<Vec<RosterRow>, RosterError> {
        let mut url = Url::parse(SHEETS_BASE).expect("static sheets url");
        url.path_segments_mut()
            .expect("https url has path segments")
            .push(spreadsheet_id)
            .push("values")
            .push(worksheet);

        let response = self
            .http
            .get(url)
            .query(&[("majorDimension", "ROWS")])
            .bearer_auth(&self.token)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterError::Status {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        let range: ValueRange = response.json()?;
        tracing::debug!(rows = range.values.len(), worksheet, "fetched roster values");
        rows_from_values(&range.values, columns)
    }

    /// Resolve a spreadsheet id from its document name.
    ///
    /// Goes through the Drive files index — the Sheets API itself has no
    /// by-name lookup. Used when the configuration names the sheet instead
    /// of pinning its id.
    pub fn resolve_spreadsheet_id(&self, name: &str) -> Result<String, RosterError> {
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );

        let response = self
            .http
            .get(DRIVE_FILES_BASE)
            .query(&[
                ("q", query.as_str()),
                ("pageSize", "1"),
                ("fields", "files(id)"),
            ])
            .bearer_auth(&self.token)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterError::Status {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }

        let list: FileList = response.json()?;
        list.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| RosterError::SpreadsheetNotFound(name.to_string()))
    }
}

/// Map raw sheet values (header row first) into roster rows.
fn rows_from_values(
    values: &[Vec<serde_json::Value>],
    columns: &ColumnMap,
) -> Result<Vec<RosterRow>, RosterError> {
    let Some((header_row, data_rows)) = values.split_first() else {
        return Ok(Vec::new());
    };

    let header: Vec<String> = header_row.iter().map(cell_text).collect();
    let find = |wanted: &str| header.iter().position(|h| h == wanted);

    let mut missing = Vec::new();
    let name_idx = find(&columns.name);
    let image_idx = find(&columns.image_url);
    if name_idx.is_none() {
        missing.push(columns.name.clone());
    }
    if image_idx.is_none() {
        missing.push(columns.image_url.clone());
    }

    let optional_idx = |configured: &Option<String>, missing: &mut Vec<String>| match configured {
        Some(wanted) => {
            let idx = find(wanted);
            if idx.is_none() {
                missing.push(wanted.clone());
            }
            idx
        }
        None => None,
    };

    let gender_idx = optional_idx(&columns.gender, &mut missing);
    let college_idx = optional_idx(&columns.college, &mut missing);
    let studying_idx = optional_idx(&columns.studying, &mut missing);
    let branch_idx = optional_idx(&columns.branch, &mut missing);

    if !missing.is_empty() {
        return Err(RosterError::MissingColumns(missing));
    }

    // Indices are present past this point; short rows read as empty cells.
    let cell = |row: &[serde_json::Value], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).map(cell_text).unwrap_or_default()
    };
    let meta = |row: &[serde_json::Value], idx: Option<usize>| -> Option<String> {
        idx.map(|_| cell(row, idx)).filter(|s| !s.is_empty())
    };

    let rows = data_rows
        .iter()
        .map(|row| RosterRow {
            name: cell(row, name_idx),
            image_link: cell(row, image_idx),
            gender: meta(row, gender_idx),
            college: meta(row, college_idx),
            studying: meta(row, studying_idx),
            branch: meta(row, branch_idx),
        })
        .collect();

    Ok(rows)
}

/// Sheet cells arrive as JSON strings under FORMATTED_VALUE, but numeric
/// cells can still surface as numbers.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
