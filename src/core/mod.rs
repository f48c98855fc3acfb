pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, LlmConfig, ProviderRole};
pub use error::{Result, SimError};
pub use types::{ActorId, Round, SimulationId};
