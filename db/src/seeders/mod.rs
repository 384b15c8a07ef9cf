pub mod student_seeder;

use crate::store::{KeyValueStore, StoreError};
use std::sync::Arc;

/// Seeds every collection that has never been written.
pub async fn seed(store: Arc<dyn KeyValueStore>) -> Result<(), StoreError> {
    student_seeder::seed_if_empty(store).await?;
    Ok(())
}
