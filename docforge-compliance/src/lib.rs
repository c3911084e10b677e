//! Compliance scoring for generated document sets: per-document structure,
//! terminology and checklist coverage plus cross-document consistency.

pub mod consistency;
pub mod error;
pub mod report;
pub mod scorer;
pub mod standard;
pub mod validator;

pub use consistency::*;
pub use error::{ComplianceError, Result};
pub use report::*;
pub use scorer::*;
pub use standard::*;
pub use validator::*;
