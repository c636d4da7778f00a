//! Pure processing stages of a run: chunk planning, series assembly, and
//! ledger summaries.

pub mod assemble;
pub mod chunk;
pub mod summary;

pub use assemble::{assemble, expected_timeline, AssembledSeries};
pub use chunk::{Chunk, ChunkPlanner};
pub use summary::{summarize, CompletenessPolicy};
