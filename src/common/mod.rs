pub mod commands;
pub mod events;
pub mod types;

pub use commands::NetworkCommand;
pub use events::NetworkEvent;
pub use types::{
    BatchAnswer, Category, ChatMessage, ConsultOutcome, ConsultRequest, HealthStatus, ModelInfo,
    RequestId, Sender, Shortcut,
};
