pub mod feed;
pub mod normalize;
pub mod pipeline;
pub mod run_lock;

pub use feed::{fetch_since, FeedPage, TradeFeed};
pub use normalize::normalize_trade;
pub use pipeline::{CycleReport, ScanSettings, Scanner, TradeOutcome};
pub use run_lock::RunLock;
