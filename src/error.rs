use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("app not initialized")]
    NotInitialized,

    #[error("no wallet connected")]
    WalletNotConnected,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Sdk(#[from] umiq_sdk::Error),

    #[error(transparent)]
    Node(#[from] umiq_sdk::NodeError),

    #[error("store error: {0}")]
    Store(#[from] umiq_store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AppError> for String {
    fn from(e: AppError) -> Self {
        e.to_string()
    }
}
