mod error;
mod models;
mod schema;
mod store;

pub use error::StoreError;
pub use store::{MIGRATIONS, StoreEntry, UmiqStore};

pub type Result<T> = std::result::Result<T, StoreError>;
