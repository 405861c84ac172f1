//! Remote file tree: an arena of nodes a provider resolves from a URL,
//! realized to disk by the materializer.
//!
//! Nodes are addressed by `NodeId` handles. Each node owns its list of
//! child handles; the parent link is a plain back-reference used only for
//! root detection, keeping ownership acyclic.

mod materialize;

pub use materialize::materialize;

/// Handle to a node within one `FileTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// What one remote entity is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Interior node: becomes a directory, never fetched as bytes.
    Folder { name: String },
    /// Leaf: exactly one byte-stream fetch. `name` may be unknown until
    /// the response arrives (Content-Disposition).
    File { url: String, name: Option<String> },
}

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena of remote nodes. Built by a provider, walked once by the
/// materializer, then discarded.
#[derive(Default)]
pub struct FileTree {
    nodes: Vec<Node>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a tree holding a single leaf.
    pub fn single_file(url: impl Into<String>, name: Option<String>) -> Self {
        let mut tree = Self::new();
        tree.add_root(NodeKind::File {
            url: url.into(),
            name,
        });
        tree
    }

    /// Adds the root node. Must be the first node added.
    pub fn add_root(&mut self, kind: NodeKind) -> NodeId {
        debug_assert!(self.nodes.is_empty(), "root must be the first node");
        self.push(None, kind)
    }

    /// Attaches a child under `parent`. Only folder nodes take children.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        debug_assert!(
            matches!(self.nodes[parent.0].kind, NodeKind::Folder { .. }),
            "children can only be attached to folder nodes"
        );
        let id = self.push(Some(parent), kind);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// The root handle, if any node was added.
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Children in insertion order; materialization follows this order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes[id.0].parent.is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
