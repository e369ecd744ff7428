pub mod live;
pub mod memory;
pub mod state;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use state::AppState;
pub use store::*;
pub use supabase::SupabaseStore;
