//! Node State Module
//!
//! Role/mode model of this node and the runtime partition filter
//! it carries.

mod node;
mod partition;

pub use node::{NodeRole, NodeState, ReplicationMode};
pub use partition::PartitionFilter;
