// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::{
    cache::DEFAULT_TTL_SECS,
    kpi::{KpiSpec, NamedColumn},
    normalize::{HeaderLocation, HeaderSpec, NormalizeOptions},
};

pub const DEFAULT_CONFIG_PATH: &str = "sheetdash.yaml";

/// Top-level `sheetdash.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub normalize: NormalizeConfig,
    pub cache: CacheConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    SheetsApi,
    CsvUrl,
    CsvFile,
}

/// Where the raw grid comes from. Secrets are never stored here, only the
/// names of the environment variables holding them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Spreadsheet URL or bare id.
    pub spreadsheet: String,
    /// Tab name, e.g. `CONTROLE - B. DADOS`.
    pub sheet: String,
    pub token_env: Option<String>,
    pub api_key_env: Option<String>,
    /// Overrides the service root (Sheets API or docs host).
    pub base_url: Option<String>,
    /// Directory holding `<sheet>.csv` files.
    pub dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::SheetsApi,
            spreadsheet: String::new(),
            sheet: "CONTROLE - B. DADOS".into(),
            token_env: Some("SHEETDASH_TOKEN".into()),
            api_key_env: Some("SHEETDASH_API_KEY".into()),
            base_url: None,
            dir: "data".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub header: HeaderSpec,
    /// Label that identifies the header row; `None` means the first row.
    pub marker: Option<String>,
    pub decimal_comma: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            header: HeaderSpec::Single,
            marker: None,
            decimal_comma: true,
        }
    }
}

impl NormalizeConfig {
    pub fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            header: self.header,
            location: match &self.marker {
                Some(m) if !m.trim().is_empty() => HeaderLocation::Marker(m.clone()),
                _ => HeaderLocation::First,
            },
            decimal_comma: self.decimal_comma,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs.max(0))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub title: String,
    pub subtitle: String,
    /// Data rows on the table slide.
    pub max_table_rows: usize,
    pub status_column: String,
    /// Numeric columns whose name contains this are totalled.
    pub totals_keyword: String,
    /// Summed columns on the KPI slide.
    pub sum_kpis: Vec<NamedColumn>,
    /// Averaged column on the KPI slide, shown as a percentage.
    pub mean_kpi: Option<NamedColumn>,
    /// Line chart of `y` against `x`; skipped when either column is absent.
    pub evolution_x: Option<String>,
    pub evolution_y: Option<String>,
    /// Distinct values shown per distribution chart.
    pub top_values: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Dashboard Fiscalização".into(),
            subtitle: "Relatório Executivo Gerado Automaticamente".into(),
            max_table_rows: 14,
            status_column: "Status".into(),
            totals_keyword: "AÇÕES".into(),
            sum_kpis: vec![
                NamedColumn::new("Total de Ações", "TOTAL_ACOES"),
                NamedColumn::new("Total Banco de Dados", "TOTAL_BD"),
            ],
            mean_kpi: Some(NamedColumn::new("Índice de Conformidade", "CONFORMIDADE")),
            evolution_x: Some("DATA".into()),
            evolution_y: Some("TOTAL_ACOES".into()),
            top_values: 10,
        }
    }
}

impl ExportConfig {
    pub fn kpi_spec(&self) -> KpiSpec<'_> {
        KpiSpec {
            status_column: &self.status_column,
            totals_keyword: &self.totals_keyword,
            sums: &self.sum_kpis,
            mean_percent: self.mean_kpi.as_ref(),
        }
    }

    /// `(x, y)` of the evolution chart, when both are set.
    pub fn evolution_axes(&self) -> Option<(&str, &str)> {
        match (&self.evolution_x, &self.evolution_y) {
            (Some(x), Some(y)) => Some((x.as_str(), y.as_str())),
            _ => None,
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML config")
    }

    /// Load `path`; a missing file at the default location yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn omitted_keys_take_defaults() -> Result<()> {
        let cfg = Config::from_yaml(
            r#"
source:
  spreadsheet: "https://docs.google.com/spreadsheets/d/abc123/edit"
normalize:
  marker: DATA
"#,
        )?;
        assert_eq!(cfg.source.kind, SourceKind::SheetsApi);
        assert_eq!(cfg.source.sheet, "CONTROLE - B. DADOS");
        assert_eq!(cfg.cache.ttl(), chrono::Duration::seconds(300));
        assert_eq!(cfg.export.max_table_rows, 14);
        assert_eq!(cfg.export.evolution_axes(), Some(("DATA", "TOTAL_ACOES")));
        let spec = cfg.export.kpi_spec();
        assert_eq!(
            spec.sums.iter().map(|k| k.column.as_str()).collect::<Vec<_>>(),
            vec!["TOTAL_ACOES", "TOTAL_BD"]
        );
        assert_eq!(
            spec.mean_percent.map(|k| k.label.as_str()),
            Some("Índice de Conformidade")
        );
        assert_eq!(
            cfg.normalize.options(),
            NormalizeOptions {
                header: HeaderSpec::Single,
                location: HeaderLocation::Marker("DATA".into()),
                decimal_comma: true,
            }
        );
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let cfg = Config::from_yaml(
            r#"
source:
  kind: csv_file
  dir: fixtures
  sheet: controle
normalize:
  header: double
  decimal_comma: false
cache:
  ttl_secs: 60
export:
  max_table_rows: 5
  evolution_x: DATA
  evolution_y: TOTAL_ACOES
"#,
        )?;
        assert_eq!(cfg.source.kind, SourceKind::CsvFile);
        assert_eq!(cfg.normalize.header, HeaderSpec::Double);
        assert_eq!(cfg.normalize.options().location, HeaderLocation::First);
        assert_eq!(cfg.cache.ttl_secs, 60);
        assert_eq!(cfg.export.evolution_y.as_deref(), Some("TOTAL_ACOES"));
        assert_eq!(cfg.export.status_column, "Status");
        Ok(())
    }

    #[test]
    fn kpis_and_evolution_can_be_replaced_or_disabled() -> Result<()> {
        let cfg = Config::from_yaml(
            r#"
export:
  sum_kpis:
    - label: Autuações
      column: AUTUACOES
  mean_kpi: null
  evolution_y: null
"#,
        )?;
        assert_eq!(cfg.export.sum_kpis, vec![NamedColumn::new("Autuações", "AUTUACOES")]);
        assert!(cfg.export.kpi_spec().mean_percent.is_none());
        assert_eq!(cfg.export.evolution_axes(), None);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_yaml("cache:\n  ttl: 5\n").unwrap_err();
        assert!(format!("{:#}", err).contains("ttl"));
    }

    #[test]
    fn load_reads_a_file() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "export:\n  title: Painel")?;
        let cfg = Config::load(tmp.path())?;
        assert_eq!(cfg.export.title, "Painel");
        assert!(Config::load("/nonexistent/sheetdash.yaml").is_err());
        Ok(())
    }
}
