//! Refresh of an owner's pools, products and content against upstream data.
//!
//! A refresh proceeds in stages:
//!
//! - [`EntityMapper`]s collect the existing and imported version of every
//!   entity, keyed by upstream id
//! - [`NodeFactory`] turns the mappers into a [`NodeMapper`] graph
//!   (pool → product → derived/provided product and content)
//! - [`NodeProcessor`] walks the graph children-first, letting a
//!   [`NodeVisitor`] per entity kind decide and persist each node's state
//! - [`RefreshWorker`] wires all of this together for one owner

mod config;
mod error;
mod factory;
mod mapper;
mod node;
mod node_mapper;
mod processor;
mod result;
mod visitor;
pub mod visitors;
mod worker;

pub use config::RefreshConfig;
pub use error::{RefreshError, Result};
pub use factory::NodeFactory;
pub use mapper::{
    ContentMapper, ContentStrategy, EntityMapper, EntityStrategy, PoolMapper, PoolStrategy,
    ProductMapper, ProductStrategy,
};
pub use node::{AnyNode, ContentNode, EntityKind, EntityNode, NodeKey, NodeState, PoolNode, ProductNode};
pub use node_mapper::NodeMapper;
pub use processor::NodeProcessor;
pub use result::{EntityState, RefreshResult};
pub use visitor::NodeVisitor;
pub use worker::RefreshWorker;
