pub mod actions;
mod envelope;
pub mod node;
mod registry;
pub mod template;

pub use envelope::Envelope;
pub use node::{Node, NodeConfig, NodeId};
pub use registry::NodeRegistry;
