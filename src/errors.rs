use thiserror::Error;

/// Trade feed could not be read. Retryable: the cycle is abandoned and the
/// next scheduled run tries again.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("feed returned an undecodable payload: {0}")]
    Decode(String),
}

/// A single provider record that could not be normalized into a trade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("missing trader address")]
    MissingTrader,

    #[error("no amount strategy matched")]
    MissingAmount,

    #[error("negative amount: {0}")]
    NegativeAmount(String),

    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),

    #[error("record is not a JSON object")]
    NotAnObject,
}

/// Activity or user-directory lookup failed.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("profile source unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("unexpected profile response: {0}")]
    Unexpected(String),
}

/// One alert sink failed. Logged and counted; never aborts other sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sink returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Reasons a whole scan cycle did not run to completion.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("another scan cycle holds the run lock at {0}")]
    Locked(String),

    #[error("run lock error: {0}")]
    Lock(#[from] std::io::Error),
}
