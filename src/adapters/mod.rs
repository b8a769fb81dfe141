//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: JSON model bundle loaded from the model directory
//! - `memory`: in-process session store
//! - `sqlite`: SQLite session store
//! - `sanitize`: identifier redaction for logs

pub mod artifacts;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

pub use artifacts::{load_model_dir, ArtifactError, LoadOptions};
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
