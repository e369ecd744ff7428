use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::memory::InMemoryStore;
use crate::store::ClinicStore;
use crate::supabase::SupabaseStore;

/// Shared router state: configuration plus the injected store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Picks the store named by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn ClinicStore> = match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-memory clinic store");
                Arc::new(InMemoryStore::new(config.live_channel_capacity))
            }
            StoreBackend::Supabase => {
                info!("Using Supabase clinic store at {}", config.supabase_url);
                Arc::new(SupabaseStore::new(&config))
            }
        };

        Self::new(config, store)
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new(config.live_channel_capacity));
        Self::new(config, store)
    }
}
