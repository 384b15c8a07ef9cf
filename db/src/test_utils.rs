use crate::store::SqliteStore;

pub async fn setup_test_db() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db")
}
