//! Tool Handlers.
//!
//! One module per capability's executable side. Each implements
//! `CapabilityHandler` and is bound to a `Capability.handler_ref` at
//! registry construction time (see `cortex-gateway`'s wiring) — no code
//! here is ever called directly by Understanding or the Orchestrator.

mod announcement;
mod forced_listening;
mod general_conversation;
mod goal;
mod identity_link;
mod knowledge;
mod tasks;

pub use announcement::CreateAnnouncementHandler;
pub use forced_listening::ForcedListeningHandler;
pub use general_conversation::GeneralConversationHandler;
pub use goal::RegisterGoalHandler;
pub use identity_link::LinkIdentityHandler;
pub use knowledge::SearchKnowledgeHandler;
pub use tasks::{CreateTaskHandler, ListTasksHandler};
