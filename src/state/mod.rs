//! State management module
//!
//! This module handles conversation state, the transition table, the
//! in-process conversation registry and snapshot persistence.

pub mod context;
pub mod machine;
pub mod registry;
pub mod storage;

// Re-export commonly used state components
pub use context::{Conversation, ConversationKey, ConversationSnapshot, ConversationSummary, TransitionData, TransitionRecord};
pub use machine::ConversationState;
pub use registry::{ConversationGuard, ConversationRegistry, RegistryManager, RegistryStats, SweepReport};
pub use storage::SnapshotStore;
