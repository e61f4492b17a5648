// src/fetch/mod.rs
//
// Sheet sources: each returns every row of one tab as a raw grid.

pub mod csv;
pub mod sheets;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::{env, future::Future};
use url::Url;

use crate::{
    config::{SourceConfig, SourceKind},
    normalize::RawGrid,
};

pub use self::csv::{parse_csv, CsvFileSource};
pub use sheets::{spreadsheet_id, CsvUrlSource, SheetsApiSource};

/// Anything that can hand over all rows of a named tab. Errors are fatal
/// for the load (auth failure, unknown sheet, unreadable file).
pub trait SheetSource {
    fn get_all_rows(&self, sheet: &str) -> impl Future<Output = Result<RawGrid>> + Send;
}

/// How requests to the spreadsheet service are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `?key=<api key>`, for sheets shared publicly.
    ApiKey(String),
    Anonymous,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(***)"),
            Credentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

impl Credentials {
    /// Bearer token first, then API key, read from the named variables.
    pub fn from_env(token_env: Option<&str>, api_key_env: Option<&str>) -> Self {
        let read = |name: Option<&str>| {
            name.and_then(|n| env::var(n).ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(token) = read(token_env) {
            Credentials::Bearer(token)
        } else if let Some(key) = read(api_key_env) {
            Credentials::ApiKey(key)
        } else {
            Credentials::Anonymous
        }
    }
}

/// The source picked by configuration.
#[derive(Debug, Clone)]
pub enum Source {
    SheetsApi(SheetsApiSource),
    CsvUrl(CsvUrlSource),
    CsvFile(CsvFileSource),
}

impl Source {
    pub fn from_config(client: &Client, cfg: &SourceConfig) -> Result<Self> {
        let credentials =
            Credentials::from_env(cfg.token_env.as_deref(), cfg.api_key_env.as_deref());
        let base = |default: &str| -> Result<Url> {
            let raw = cfg.base_url.as_deref().unwrap_or(default);
            Url::parse(raw).with_context(|| format!("parsing base URL {}", raw))
        };

        match cfg.kind {
            SourceKind::SheetsApi | SourceKind::CsvUrl if cfg.spreadsheet.trim().is_empty() => {
                Err(anyhow!("source.spreadsheet is required for {:?}", cfg.kind))
            }
            SourceKind::SheetsApi => Ok(Source::SheetsApi(SheetsApiSource::new(
                client.clone(),
                base(sheets::SHEETS_API_BASE)?,
                &cfg.spreadsheet,
                credentials,
            ))),
            SourceKind::CsvUrl => Ok(Source::CsvUrl(CsvUrlSource::new(
                client.clone(),
                base(sheets::DOCS_BASE)?,
                &cfg.spreadsheet,
                credentials,
            ))),
            SourceKind::CsvFile => Ok(Source::CsvFile(CsvFileSource::new(&cfg.dir))),
        }
    }
}

impl SheetSource for Source {
    async fn get_all_rows(&self, sheet: &str) -> Result<RawGrid> {
        match self {
            Source::SheetsApi(s) => s.get_all_rows(sheet).await,
            Source::CsvUrl(s) => s.get_all_rows(sheet).await,
            Source::CsvFile(s) => s.get_all_rows(sheet).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_prefer_token_and_skip_blank_values() {
        env::set_var("SHEETDASH_TEST_TOKEN_A", "tok");
        env::set_var("SHEETDASH_TEST_KEY_A", "key");
        env::set_var("SHEETDASH_TEST_BLANK_A", "  ");

        assert_eq!(
            Credentials::from_env(Some("SHEETDASH_TEST_TOKEN_A"), Some("SHEETDASH_TEST_KEY_A")),
            Credentials::Bearer("tok".into())
        );
        assert_eq!(
            Credentials::from_env(Some("SHEETDASH_TEST_BLANK_A"), Some("SHEETDASH_TEST_KEY_A")),
            Credentials::ApiKey("key".into())
        );
        assert_eq!(
            Credentials::from_env(Some("SHEETDASH_TEST_UNSET_A"), None),
            Credentials::Anonymous
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let shown = format!("{:?}", Credentials::Bearer("secret".into()));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn remote_sources_need_a_spreadsheet() {
        let cfg = SourceConfig::default();
        let err = Source::from_config(&Client::new(), &cfg).unwrap_err();
        assert!(err.to_string().contains("source.spreadsheet"));

        let cfg = SourceConfig {
            kind: SourceKind::CsvFile,
            ..SourceConfig::default()
        };
        assert!(matches!(
            Source::from_config(&Client::new(), &cfg),
            Ok(Source::CsvFile(_))
        ));
    }
}
