pub mod models;
pub mod repository;
pub mod seeders;
pub mod store;
pub mod test_utils;

use std::path::Path;
use store::{SqliteStore, StoreError};
use util::config;

/// Opens the store named by `DATABASE_PATH`.
///
/// A value starting with `sqlite:` is used as a DSN; anything else is treated
/// as a file path whose parent directory is created on demand.
pub async fn connect() -> Result<SqliteStore, StoreError> {
    let path_or_url = config::database_path();
    let url = if path_or_url.starts_with("sqlite:") {
        path_or_url
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(&path_or_url).parent() {
            std::fs::create_dir_all(parent)?;
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    SqliteStore::connect(&url).await
}
