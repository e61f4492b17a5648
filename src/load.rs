// src/load.rs

use anyhow::{Context, Result};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;

use crate::{
    cache::{Clock, SystemClock, TableCache},
    fetch::SheetSource,
    normalize::{assemble, NormalizeOptions, NormalizedTable},
};

/// Fetch → normalize, memoized for the cache TTL.
pub struct Loader<S, C = SystemClock> {
    source: S,
    sheet: String,
    options: NormalizeOptions,
    cache: TableCache<NormalizedTable, C>,
}

impl<S: SheetSource> Loader<S, SystemClock> {
    pub fn new(
        source: S,
        sheet: impl Into<String>,
        options: NormalizeOptions,
        ttl: Duration,
    ) -> Self {
        Self::with_cache(source, sheet, options, TableCache::new(ttl))
    }
}

impl<S: SheetSource, C: Clock> Loader<S, C> {
    pub fn with_cache(
        source: S,
        sheet: impl Into<String>,
        options: NormalizeOptions,
        cache: TableCache<NormalizedTable, C>,
    ) -> Self {
        Self {
            source,
            sheet: sheet.into(),
            options,
            cache,
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// The cached table while fresh, otherwise a new fetch + normalize.
    /// Source failures and fatal input errors propagate; nothing is cached then.
    #[tracing::instrument(level = "info", skip(self), fields(sheet = %self.sheet))]
    pub async fn load(&mut self) -> Result<Arc<NormalizedTable>> {
        let source = &self.source;
        let sheet = self.sheet.as_str();
        let options = &self.options;

        self.cache
            .get_or_try_load(|| async move {
                let grid = source
                    .get_all_rows(sheet)
                    .await
                    .with_context(|| format!("loading sheet '{}'", sheet))?;
                info!(rows = grid.len(), "fetched raw grid");
                let table = assemble(&grid, options)?;
                Ok::<_, anyhow::Error>(table)
            })
            .await
    }

    /// Drop the cached table so the next `load` fetches again.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::ManualClock,
        error::FatalInputError,
        normalize::{HeaderLocation, RawGrid},
    };
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        grid: RawGrid,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSource {
        fn new(rows: &[&[&str]]) -> Self {
            Self {
                grid: rows
                    .iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    impl SheetSource for FakeSource {
        async fn get_all_rows(&self, sheet: &str) -> Result<RawGrid> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("worksheet '{}' not found", sheet));
            }
            Ok(self.grid.clone())
        }
    }

    fn loader(
        source: FakeSource,
        options: NormalizeOptions,
    ) -> (Loader<FakeSource, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
        let cache = TableCache::with_clock(Duration::seconds(300), clock.clone());
        (Loader::with_cache(source, "Aba", options, cache), clock)
    }

    #[tokio::test]
    async fn loads_are_memoized_until_expiry() -> Result<()> {
        let (mut loader, clock) = loader(
            FakeSource::new(&[&["DATA", "TOTAL"], &["01/02", "2"]]),
            NormalizeOptions::default(),
        );

        let first = loader.load().await?;
        clock.advance(Duration::seconds(120));
        let second = loader.load().await?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::seconds(180));
        let third = loader.load().await?;
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
        assert_eq!(loader.source.calls.load(Ordering::SeqCst), 2);

        loader.invalidate();
        loader.load().await?;
        assert_eq!(loader.source.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn missing_marker_surfaces_as_typed_error() {
        let options = NormalizeOptions {
            location: HeaderLocation::Marker("STATUS".into()),
            ..Default::default()
        };
        let (mut loader, _) = loader(FakeSource::new(&[&["a"], &["1"]]), options);

        let err = loader.load().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FatalInputError>(),
            Some(&FatalInputError::MarkerNotFound {
                marker: "STATUS".into()
            })
        );
        assert!(loader.cache.get().is_none());
    }

    #[tokio::test]
    async fn source_errors_name_the_sheet() {
        let mut source = FakeSource::new(&[]);
        source.fail = true;
        let (mut loader, _) = loader(source, NormalizeOptions::default());

        let err = loader.load().await.unwrap_err();
        assert_eq!(err.to_string(), "loading sheet 'Aba'");
        assert!(format!("{:#}", err).contains("worksheet 'Aba' not found"));
    }

    #[tokio::test]
    async fn empty_sheet_loads_as_empty_table() -> Result<()> {
        let (mut loader, _) = loader(FakeSource::new(&[]), NormalizeOptions::default());
        let table = loader.load().await?;
        assert!(table.is_empty());
        Ok(())
    }
}
