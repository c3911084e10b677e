pub mod ids;
pub mod task;
pub mod context;
pub mod result;
pub mod compliance;

pub use ids::*;
pub use task::*;
pub use context::*;
pub use result::*;
pub use compliance::*;
