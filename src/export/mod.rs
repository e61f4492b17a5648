// src/export/mod.rs

pub mod parquet;
pub mod pptx;

pub use self::parquet::write_parquet;
pub use pptx::{DeckBuilder, DEFAULT_MAX_TABLE_ROWS};

use crate::{chart::Chart, kpi::Kpis, normalize::NormalizedTable};

/// Cover, KPI slide, data table (first `max_rows` rows, or all for
/// `None`), then one slide per non-empty chart.
pub fn report_deck(
    title: &str,
    subtitle: &str,
    table: &NormalizedTable,
    kpis: &Kpis,
    charts: &[Chart],
    max_rows: Option<usize>,
) -> DeckBuilder {
    let mut deck = DeckBuilder::new(title);
    deck.cover_slide(title, subtitle)
        .text_slide("Indicadores", &kpis.lines());
    if !table.is_empty() {
        deck.table_slide("Base Completa", table, max_rows);
    }
    for chart in charts.iter().filter(|c| !c.is_empty()) {
        deck.chart_slide(chart);
    }
    deck
}
