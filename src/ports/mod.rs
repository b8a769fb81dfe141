//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the loaded model artifacts and session storage.

mod model;
mod session;

pub use model::{CategoricalEncoder, Classifier, FeatureScaler, ModelError};
pub use session::{SessionError, SessionStore};
