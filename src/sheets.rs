//! Sheet loading
//!
//! Fetches one tab of a publicly shared spreadsheet as CSV and turns it into
//! [`Row`] records keyed by the header line. When the CSV path fails, the
//! JSON-flavoured export of the same tab is requested purely to enrich the
//! error with what the remote side reports (status, column labels, messages).
//! That second request never produces rows.

use log::{debug, info, warn};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::config::{PortalConfig, SheetRef};
use crate::error::SheetError;

/// One parsed CSV record, keyed by column header.
///
/// Pairs keep the sheet's left-to-right column order. Values are the raw cell
/// text; `""` is an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Row { cells: Vec::new() }
    }

    /// Build a row from header/value pairs, in column order.
    pub fn from_pairs<H, V>(pairs: impl IntoIterator<Item = (H, V)>) -> Self
    where
        H: Into<String>,
        V: Into<String>,
    {
        let mut row = Row::new();
        for (header, value) in pairs {
            row.insert(header, value);
        }
        row
    }

    /// Set a cell. A repeated header keeps its first position and takes the
    /// new value.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Value by column position (0-based).
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|(_, v)| v.as_str())
    }

    /// Header by column position (0-based).
    pub fn header_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|(h, _)| h.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// First cell whose trimmed text is non-empty, trimmed.
    pub fn first_non_empty(&self) -> Option<&str> {
        self.values().map(str::trim).find(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// What the JSON export reported when the CSV export failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GvizDiagnostics {
    /// `ok`, `warning` or `error`
    pub status: String,

    /// Column labels the sheet exposes for the requested range
    pub column_labels: Vec<String>,

    /// Error and warning messages, detailed text preferred
    pub messages: Vec<String>,
}

#[derive(Deserialize)]
struct GvizResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Vec<GvizMessage>,
    #[serde(default)]
    warnings: Vec<GvizMessage>,
    #[serde(default)]
    table: Option<GvizTable>,
}

#[derive(Deserialize)]
struct GvizMessage {
    #[serde(default)]
    message: String,
    #[serde(default)]
    detailed_message: Option<String>,
}

#[derive(Deserialize)]
struct GvizTable {
    #[serde(default)]
    cols: Vec<GvizColumn>,
}

#[derive(Deserialize)]
struct GvizColumn {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
}

/// Fetches sheets from one spreadsheet.
///
/// Holds no state between calls; every [`SheetLoader::fetch_rows`] goes back
/// to the network.
#[derive(Debug, Clone)]
pub struct SheetLoader {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
}

impl SheetLoader {
    pub fn new(config: &PortalConfig) -> Self {
        Self::with_client(reqwest::Client::new(), &config.base_url, &config.spreadsheet_id)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, spreadsheet_id: &str) -> Self {
        SheetLoader {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    /// CSV export URL for a sheet reference.
    ///
    /// # Arguments
    /// * `sheet_ref` - Sheet name and optional range
    /// * `cache_buster` - Value for the `_` query parameter, normally epoch millis
    pub fn csv_url(&self, sheet_ref: &SheetRef, cache_buster: i64) -> String {
        self.export_url("csv", sheet_ref, cache_buster)
    }

    /// JSON export URL, used only for failure diagnostics.
    pub fn json_url(&self, sheet_ref: &SheetRef, cache_buster: i64) -> String {
        self.export_url("json", sheet_ref, cache_buster)
    }

    fn export_url(&self, format: &str, sheet_ref: &SheetRef, cache_buster: i64) -> String {
        let mut url = format!(
            "{}/spreadsheets/d/{}/gviz/tq?tqx=out:{}&sheet={}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            format,
            urlencoding::encode(&sheet_ref.sheet)
        );
        if let Some(range) = &sheet_ref.range {
            url.push_str("&range=");
            url.push_str(&urlencoding::encode(range));
        }
        url.push_str(&format!("&_={}", cache_buster));
        url
    }

    /// Fetch a sheet and parse it into rows.
    ///
    /// # Arguments
    /// * `sheet_ref` - Sheet name and optional range
    ///
    /// # Returns
    /// * `Result<Vec<Row>, SheetError>` - At least one row, or a failure naming
    ///   the sheet and range
    ///
    /// # Errors
    /// * Transport errors and non-success statuses
    /// * A body that starts with `<` (an HTML error page served as success)
    /// * A CSV with no data rows
    pub async fn fetch_rows(&self, sheet_ref: &SheetRef) -> Result<Vec<Row>, SheetError> {
        let url = self.csv_url(sheet_ref, chrono::Utc::now().timestamp_millis());
        info!("Fetching sheet \"{}\" from {}", sheet_ref.sheet, url);

        let outcome = match self.get_text(&url).await {
            Ok((status, body)) => rows_from_response(sheet_ref, status, &body),
            Err(reason) => Err(unavailable(sheet_ref, reason)),
        };

        match outcome {
            Ok(rows) => Ok(rows),
            Err(err) => {
                warn!("{}", err);
                let diagnostics = self.diagnose(sheet_ref).await;
                Err(err.with_diagnostics(diagnostics))
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<(u16, String), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {}", e))?;
        Ok((status, body))
    }

    async fn diagnose(&self, sheet_ref: &SheetRef) -> Option<GvizDiagnostics> {
        let url = self.json_url(sheet_ref, chrono::Utc::now().timestamp_millis());
        debug!("Requesting JSON export for diagnostics: {}", url);

        let body = match self.get_text(&url).await {
            Ok((_, body)) => body,
            Err(reason) => {
                warn!("Diagnostic request for \"{}\" failed: {}", sheet_ref.sheet, reason);
                return None;
            }
        };

        let diagnostics = parse_gviz_diagnostics(&body);
        match &diagnostics {
            Some(d) => warn!(
                "Sheet \"{}\" diagnostics: status={}, columns={:?}, messages={:?}",
                sheet_ref.sheet, d.status, d.column_labels, d.messages
            ),
            None => warn!(
                "Sheet \"{}\" diagnostics unreadable: {}",
                sheet_ref.sheet,
                preview(&body)
            ),
        }
        diagnostics
    }
}

fn unavailable(sheet_ref: &SheetRef, reason: String) -> SheetError {
    SheetError::Unavailable {
        sheet: sheet_ref.sheet.clone(),
        range: sheet_ref.range.clone(),
        reason,
        diagnostics: None,
    }
}

fn preview(body: &str) -> String {
    body.chars().take(120).collect()
}

/// True when an export answered with an HTML page instead of CSV.
pub fn is_disguised_error(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Turn one HTTP response into rows, applying the loader's failure rules.
///
/// # Arguments
/// * `sheet_ref` - The sheet that was requested, for error context
/// * `status` - HTTP status code
/// * `body` - Response body
///
/// # Returns
/// * `Result<Vec<Row>, SheetError>` - Rows, or the failure the loader reports
pub fn rows_from_response(
    sheet_ref: &SheetRef,
    status: u16,
    body: &str,
) -> Result<Vec<Row>, SheetError> {
    if is_disguised_error(body) {
        return Err(unavailable(
            sheet_ref,
            format!("received an HTML page instead of CSV (HTTP {})", status),
        ));
    }
    if !(200..300).contains(&status) {
        return Err(unavailable(sheet_ref, format!("HTTP {}", status)));
    }

    let rows = parse_csv(body);
    if rows.is_empty() {
        return Err(SheetError::Empty {
            sheet: sheet_ref.sheet.clone(),
            range: sheet_ref.range.clone(),
            diagnostics: None,
        });
    }

    let headers: Vec<&str> = rows[0].headers().collect();
    info!(
        "Parsed {} rows from \"{}\" with headers {:?}",
        rows.len(),
        sheet_ref.sheet,
        headers
    );
    Ok(rows)
}

/// Parse CSV text into rows, using the first record as the header.
///
/// Handles quoted fields with embedded commas, doubled quotes and line
/// breaks. Blank lines are skipped. Records shorter than the header are
/// padded with empty cells; cells beyond the header are dropped.
pub fn parse_csv(text: &str) -> Vec<Row> {
    let mut records = parse_records(text).into_iter();
    let headers = match records.next() {
        Some(headers) => headers,
        None => return Vec::new(),
    };

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        if record.len() > headers.len() {
            debug!(
                "CSV record {} has {} fields, header has {}; dropping extras",
                index + 1,
                record.len(),
                headers.len()
            );
        }
        let mut row = Row::new();
        for (c, header) in headers.iter().enumerate() {
            row.insert(header.clone(), record.get(c).cloned().unwrap_or_default());
        }
        rows.push(row);
    }
    rows
}

// Split CSV text into records of fields
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current_field.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes => {
                // CRLF line endings; a lone CR is dropped
            }
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => current_field.push(c),
        }
    }

    if !current_field.is_empty() || !record.is_empty() {
        record.push(current_field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].is_empty();
    if !blank {
        records.push(record);
    }
}

/// Extract diagnostics from a GViz JSON export body.
///
/// The body is JavaScript of the form `/*O_o*/ google...setResponse({...});`;
/// the JSON object between the outer parentheses is read.
pub fn parse_gviz_diagnostics(body: &str) -> Option<GvizDiagnostics> {
    let start = body.find('(')?;
    let end = body.rfind(')')?;
    if end <= start {
        return None;
    }
    let response: GvizResponse = serde_json::from_str(&body[start + 1..end]).ok()?;

    let column_labels = response
        .table
        .map(|table| {
            table
                .cols
                .into_iter()
                .map(|col| if col.label.is_empty() { col.id } else { col.label })
                .collect()
        })
        .unwrap_or_default();

    let messages = response
        .errors
        .into_iter()
        .chain(response.warnings)
        .map(|m| m.detailed_message.unwrap_or(m.message))
        .collect();

    Some(GvizDiagnostics {
        status: response.status,
        column_labels,
        messages,
    })
}
