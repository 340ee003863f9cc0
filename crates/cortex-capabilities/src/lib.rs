pub mod registry;
pub mod types;

pub use registry::{CapabilityHandler, CapabilityRegistry};
pub use types::{Capability, HandlerMetadata, HandlerResult};
