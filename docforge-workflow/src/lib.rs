//! Scheduling and execution of document generation runs.

pub mod catalog;
pub mod dag;
pub mod engine;
pub mod executor;
pub mod options;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod settings;
pub mod tasks;

pub use catalog::*;
pub use dag::*;
pub use engine::*;
pub use executor::*;
pub use options::*;
pub use rate_limit::*;
pub use registry::*;
pub use settings::*;
pub use tasks::*;
