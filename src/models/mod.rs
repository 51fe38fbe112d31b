// Plan and progress data models

mod lenient;
pub mod plan;
pub mod progress;

pub use plan::*;
pub use progress::*;
