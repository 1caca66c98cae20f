//! Nodes of the refresh graph.

use candlepin_model::{Content, ContentInfo, Pool, Product, ProductInfo, SubscriptionInfo};
use candlepin_types::OwnerId;
use std::collections::BTreeSet;
use std::fmt;

/// Entity kinds in the graph. The declaration order is the processing
/// precedence within a depth tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Content,
    Product,
    Pool,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Content => write!(f, "content"),
            EntityKind::Product => write!(f, "product"),
            EntityKind::Pool => write!(f, "pool"),
        }
    }
}

/// Address of a node: its kind plus the entity's upstream id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub kind: EntityKind,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn content(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Content, id)
    }

    pub fn product(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Product, id)
    }

    pub fn pool(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Pool, id)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Outcome decided for a node during one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Created,
    Updated,
    /// Only references to changed children need rewriting.
    ChildrenUpdated,
    Unchanged,
    Deleted,
    Skipped,
}

impl NodeState {
    /// True for states that require the parent to refresh its references.
    pub fn is_changed(self) -> bool {
        matches!(
            self,
            NodeState::Created | NodeState::Updated | NodeState::ChildrenUpdated | NodeState::Deleted
        )
    }
}

/// One entity in the graph: its persisted and upstream versions, the
/// version the refresh produced, and its edges.
#[derive(Debug, Clone)]
pub struct EntityNode<E, I> {
    owner_id: OwnerId,
    id: String,
    existing: Option<E>,
    imported: Option<I>,
    merged: Option<E>,
    state: Option<NodeState>,
    parents: BTreeSet<NodeKey>,
    children: BTreeSet<NodeKey>,
}

impl<E, I> EntityNode<E, I> {
    pub fn new(owner_id: OwnerId, id: impl Into<String>, existing: Option<E>, imported: Option<I>) -> Self {
        Self {
            owner_id,
            id: id.into(),
            existing,
            imported,
            merged: None,
            state: None,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn existing(&self) -> Option<&E> {
        self.existing.as_ref()
    }

    pub fn imported(&self) -> Option<&I> {
        self.imported.as_ref()
    }

    pub fn merged(&self) -> Option<&E> {
        self.merged.as_ref()
    }

    pub fn set_merged(&mut self, entity: E) {
        self.merged = Some(entity);
    }

    /// The version that stands after this refresh: the merged one if the
    /// refresh wrote one, else the existing one.
    pub fn current(&self) -> Option<&E> {
        self.merged.as_ref().or(self.existing.as_ref())
    }

    pub fn state(&self) -> Option<NodeState> {
        self.state
    }

    pub fn set_state(&mut self, state: NodeState) {
        self.state = Some(state);
    }

    pub fn is_changed(&self) -> bool {
        self.state.is_some_and(NodeState::is_changed)
    }

    pub fn parents(&self) -> &BTreeSet<NodeKey> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<NodeKey> {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn parents_mut(&mut self) -> &mut BTreeSet<NodeKey> {
        &mut self.parents
    }

    pub(crate) fn children_mut(&mut self) -> &mut BTreeSet<NodeKey> {
        &mut self.children
    }
}

pub type ContentNode = EntityNode<Content, ContentInfo>;
pub type ProductNode = EntityNode<Product, ProductInfo>;
pub type PoolNode = EntityNode<Pool, SubscriptionInfo>;

/// A node of any kind, as stored in the graph.
#[derive(Debug, Clone)]
pub enum AnyNode {
    Content(ContentNode),
    Product(ProductNode),
    Pool(PoolNode),
}

macro_rules! with_node {
    ($node:expr, $n:ident => $body:expr) => {
        match $node {
            AnyNode::Content($n) => $body,
            AnyNode::Product($n) => $body,
            AnyNode::Pool($n) => $body,
        }
    };
}

impl AnyNode {
    pub fn kind(&self) -> EntityKind {
        match self {
            AnyNode::Content(_) => EntityKind::Content,
            AnyNode::Product(_) => EntityKind::Product,
            AnyNode::Pool(_) => EntityKind::Pool,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.kind(), self.id())
    }

    pub fn id(&self) -> &str {
        with_node!(self, n => n.id())
    }

    pub fn owner_id(&self) -> OwnerId {
        with_node!(self, n => n.owner_id())
    }

    pub fn state(&self) -> Option<NodeState> {
        with_node!(self, n => n.state())
    }

    pub fn set_state(&mut self, state: NodeState) {
        with_node!(self, n => n.set_state(state))
    }

    pub fn is_changed(&self) -> bool {
        with_node!(self, n => n.is_changed())
    }

    pub fn parents(&self) -> &BTreeSet<NodeKey> {
        with_node!(self, n => n.parents())
    }

    pub fn children(&self) -> &BTreeSet<NodeKey> {
        with_node!(self, n => n.children())
    }

    pub(crate) fn parents_mut(&mut self) -> &mut BTreeSet<NodeKey> {
        with_node!(self, n => n.parents_mut())
    }

    pub(crate) fn children_mut(&mut self) -> &mut BTreeSet<NodeKey> {
        with_node!(self, n => n.children_mut())
    }
}

impl From<ContentNode> for AnyNode {
    fn from(node: ContentNode) -> Self {
        AnyNode::Content(node)
    }
}

impl From<ProductNode> for AnyNode {
    fn from(node: ProductNode) -> Self {
        AnyNode::Product(node)
    }
}

impl From<PoolNode> for AnyNode {
    fn from(node: PoolNode) -> Self {
        AnyNode::Pool(node)
    }
}
