pub mod ledger;
pub mod observation;
pub mod series;
pub mod time;

pub use ledger::{Ledger, LedgerEntry, RunType};
pub use observation::{Dataset, DatasetRow, Observation};
pub use series::{SeriesCatalog, SeriesDef, SeriesId, RESERVED_FACET_KEYS};
pub use time::TimeUnit;
