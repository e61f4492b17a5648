// src/fetch/sheets.rs

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::io::Cursor;
use tracing::{debug, instrument};
use url::Url;

use super::{csv::parse_csv, Credentials, SheetSource};
use crate::normalize::RawGrid;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/";
pub const DOCS_BASE: &str = "https://docs.google.com/";

static SPREADSHEET_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("id regex should parse"));

/// Id from a full spreadsheet URL, or the input itself when it is already an id.
pub fn spreadsheet_id(url_or_id: &str) -> String {
    let trimmed = url_or_id.trim();
    SPREADSHEET_ID_RE
        .captures(trimmed)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// A1 range covering a whole tab; quotes are doubled inside the name.
fn whole_sheet_range(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn authorize(req: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match credentials {
        Credentials::Bearer(token) => req.bearer_auth(token),
        Credentials::ApiKey(key) => req.query(&[("key", key)]),
        Credentials::Anonymous => req,
    }
}

fn push_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("{} cannot be used as a base URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Body of `spreadsheets.values.get`. Trailing empty cells and rows are
/// omitted by the service, and `values` is absent for an empty tab.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn grid_from_values(values: Vec<Vec<Value>>) -> RawGrid {
    values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

/// Google Sheets values API (v4).
#[derive(Debug, Clone)]
pub struct SheetsApiSource {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    credentials: Credentials,
}

impl SheetsApiSource {
    pub fn new(client: Client, base: Url, spreadsheet: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base,
            spreadsheet_id: spreadsheet_id(spreadsheet),
            credentials,
        }
    }

    pub fn values_url(&self, sheet: &str) -> Result<Url> {
        let range = whole_sheet_range(sheet);
        let mut url = push_segments(
            &self.base,
            &["v4", "spreadsheets", &self.spreadsheet_id, "values", &range],
        )?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        Ok(url)
    }
}

impl SheetSource for SheetsApiSource {
    #[instrument(level = "info", skip(self), fields(spreadsheet = %self.spreadsheet_id))]
    async fn get_all_rows(&self, sheet: &str) -> Result<RawGrid> {
        let url = self.values_url(sheet)?;
        debug!(path = url.path(), "GET sheet values");

        let body: ValueRange = authorize(self.client.get(url), &self.credentials)
            .send()
            .await
            .with_context(|| format!("GET values of sheet '{}'", sheet))?
            .error_for_status()
            .with_context(|| format!("sheet '{}' request was rejected", sheet))?
            .json()
            .await
            .with_context(|| format!("decoding values of sheet '{}'", sheet))?;

        let grid = grid_from_values(body.values);
        debug!(rows = grid.len(), "fetched sheet values");
        Ok(grid)
    }
}

/// The spreadsheet's CSV export endpoint, for link-shared sheets.
#[derive(Debug, Clone)]
pub struct CsvUrlSource {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    credentials: Credentials,
}

impl CsvUrlSource {
    pub fn new(client: Client, base: Url, spreadsheet: &str, credentials: Credentials) -> Self {
        Self {
            client,
            base,
            spreadsheet_id: spreadsheet_id(spreadsheet),
            credentials,
        }
    }

    pub fn export_url(&self, sheet: &str) -> Result<Url> {
        let mut url = push_segments(
            &self.base,
            &["spreadsheets", "d", &self.spreadsheet_id, "gviz", "tq"],
        )?;
        url.query_pairs_mut()
            .append_pair("tqx", "out:csv")
            .append_pair("sheet", sheet);
        Ok(url)
    }
}

impl SheetSource for CsvUrlSource {
    #[instrument(level = "info", skip(self), fields(spreadsheet = %self.spreadsheet_id))]
    async fn get_all_rows(&self, sheet: &str) -> Result<RawGrid> {
        let url = self.export_url(sheet)?;
        debug!(path = url.path(), "GET sheet CSV export");

        let text = authorize(self.client.get(url), &self.credentials)
            .send()
            .await
            .with_context(|| format!("GET CSV export of sheet '{}'", sheet))?
            .error_for_status()
            .with_context(|| format!("CSV export of sheet '{}' was rejected", sheet))?
            .text()
            .await
            .with_context(|| format!("reading CSV export of sheet '{}'", sheet))?;

        parse_csv(Cursor::new(text.into_bytes()))
            .with_context(|| format!("parsing CSV export of sheet '{}'", sheet))
    }
}
