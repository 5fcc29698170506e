pub mod classifier;
pub mod evaluator;
pub mod profiler;

pub use classifier::MarketClassifier;
pub use evaluator::{is_suspicious, SuspicionThresholds};
pub use profiler::{AccountProfiler, ActivitySource, DisplayNameSource, ProfileCache};
