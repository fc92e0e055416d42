//! Artifact persistence
//!
//! Models, datasets and prediction tables are written through
//! [`write_atomic`]: the bytes land in a sibling temporary file which is
//! renamed over the destination only once fully flushed, so a concurrently
//! running dashboard never reads a partial file.

mod atomic;
mod predictions;
mod store;

pub use atomic::{write_atomic, write_frame};
pub use predictions::PredictionTable;
pub use store::ArtifactStore;
