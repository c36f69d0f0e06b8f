pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::StoreBackend;
use crate::traits::{DedupStore, ThreadStore};
use crate::types::Result;
use std::sync::Arc;
use tracing::info;

/// Both persistence ports, backed by the same adapter instance.
#[derive(Clone)]
pub struct Stores {
    pub dedup: Arc<dyn DedupStore>,
    pub threads: Arc<dyn ThreadStore>,
}

impl Stores {
    pub fn from_adapter<S>(adapter: Arc<S>) -> Self
    where
        S: DedupStore + ThreadStore + 'static,
    {
        Self {
            dedup: adapter.clone(),
            threads: adapter,
        }
    }
}

/// Opens the adapter chosen by configuration and makes sure `category_id` exists.
pub async fn open(backend: &StoreBackend, category_id: &str) -> Result<Stores> {
    info!("Opening store: {}", backend.describe());
    match backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            store.add_category(category_id).await;
            Ok(Stores::from_adapter(store))
        }
        StoreBackend::Postgres { url } => {
            let store = PgStore::new(url).await?;
            store.setup_schema().await?;
            store.ensure_category(category_id, "Algemeen").await?;
            Ok(Stores::from_adapter(Arc::new(store)))
        }
    }
}
