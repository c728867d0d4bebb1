pub mod counters;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod state;
pub mod store;

pub use counters::{CounterStore, DemoGate, DemoUsage, MemoryCounterStore};
pub use error::ApiError;
pub use logging::init_logging;
pub use server::{create_router, run_server};
pub use state::AppState;
pub use store::{ConversionStore, JsonlConversionStore, MemoryConversionStore, StoreError};
