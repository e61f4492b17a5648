//! Spreadsheet tab → normalized table → dashboard KPIs, charts and exports.

pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod kpi;
pub mod load;
pub mod normalize;

pub use error::FatalInputError;
pub use load::Loader;
pub use normalize::{assemble, NormalizeOptions, NormalizedTable};
