//! Database schema and report persistence

pub mod init;
pub mod reports;
pub mod retry;

pub use init::init_database;
pub use retry::retry_on_lock;
