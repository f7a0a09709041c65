pub mod channels;
pub mod core;
pub mod intake;
pub mod llm;
pub mod main_module;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
pub use crate::core::store::{IntakeStore, MemoryIntakeStore, PgIntakeStore, StoreError};
pub use crate::intake::{InboundMessage, IntakeError, IntakeOutcome, IntakePipeline};
