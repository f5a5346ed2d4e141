use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("market {0} not found on-chain")]
    MarketNotFound(u64),

    #[error("log parse error: {0}")]
    LogParse(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("abi error: {0}")]
    Abi(String),

    #[error("invalid on-chain record: {0}")]
    InvalidRecord(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("invalid bet: {0}")]
    InvalidBet(String),

    #[error("invalid market: {0}")]
    InvalidMarket(String),

    #[error("market {0} already exists")]
    DuplicateMarket(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by [`UmiqNode`](crate::node::UmiqNode) operations.
#[derive(Debug)]
pub enum NodeError {
    /// The state store mutex was poisoned by a prior panic.
    MutexPoisoned,
    /// An SDK operation failed.
    Sdk(Error),
    /// A `spawn_blocking` task failed to join.
    Task(String),
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::MutexPoisoned => write!(f, "internal mutex poisoned by a prior panic"),
            NodeError::Sdk(e) => write!(f, "sdk error: {e}"),
            NodeError::Task(e) => write!(f, "task join error: {e}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Sdk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for NodeError {
    fn from(e: Error) -> Self {
        NodeError::Sdk(e)
    }
}
