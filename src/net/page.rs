//! 页面（子图）：节点、弧与子页面的容器，同时是局部命名作用域。
//!
//! 页面内的邻接结构使用 `StableDiGraph`，顶点权重为节点标识，边权重为弧标识。
//! `nodes`/`arcs` 两张表与邻接结构始终一一对应。
use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::net::ids::{ObjectId, Owner};

pub type Adjacency = StableDiGraph<ObjectId, ObjectId>;

#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) id: ObjectId,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<Owner>,
    pub(crate) names: IndexMap<String, ObjectId>,
    pub(crate) nodes: IndexMap<ObjectId, NodeIndex>,
    pub(crate) arcs: IndexMap<ObjectId, EdgeIndex>,
    pub(crate) pages: IndexSet<ObjectId>,
    pub(crate) graph: Adjacency,
}

impl Page {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner: None,
            names: IndexMap::new(),
            nodes: IndexMap::new(),
            arcs: IndexMap::new(),
            pages: IndexSet::new(),
            graph: Adjacency::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn count_name(&self, name: &str) -> usize {
        usize::from(self.names.contains_key(name))
    }

    /// 本页节点（库所与迁移）的标识，按加入顺序。
    pub fn nodes(&self) -> impl Iterator<Item = &ObjectId> {
        self.nodes.keys()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &ObjectId> {
        self.arcs.keys()
    }

    pub fn pages(&self) -> impl Iterator<Item = &ObjectId> {
        self.pages.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.graph
    }

    pub fn vertex(&self, node: &ObjectId) -> Option<NodeIndex> {
        self.nodes.get(node).copied()
    }

    pub fn edge(&self, arc: &ObjectId) -> Option<EdgeIndex> {
        self.arcs.get(arc).copied()
    }

    /// Nodes reached by an arc leaving `node`.
    pub fn successors(&self, node: &ObjectId) -> Vec<&ObjectId> {
        self.neighbors(node, Direction::Outgoing)
    }

    pub fn predecessors(&self, node: &ObjectId) -> Vec<&ObjectId> {
        self.neighbors(node, Direction::Incoming)
    }

    pub fn arc_between(&self, source: &ObjectId, target: &ObjectId) -> Option<&ObjectId> {
        let from = self.vertex(source)?;
        let to = self.vertex(target)?;
        let edge = self.graph.find_edge(from, to)?;
        self.graph.edge_weight(edge)
    }

    fn neighbors(&self, node: &ObjectId, direction: Direction) -> Vec<&ObjectId> {
        let Some(vertex) = self.vertex(node) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(vertex, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                &self.graph[other]
            })
            .collect()
    }

    pub(crate) fn insert_node(&mut self, id: ObjectId, name: Option<&str>) {
        if let Some(name) = name {
            self.names.insert(name.to_owned(), id.clone());
        }
        let vertex = self.graph.add_node(id.clone());
        self.nodes.insert(id, vertex);
    }

    pub(crate) fn insert_arc(
        &mut self,
        id: ObjectId,
        name: Option<&str>,
        from: NodeIndex,
        to: NodeIndex,
    ) {
        if let Some(name) = name {
            self.names.insert(name.to_owned(), id.clone());
        }
        let edge = self.graph.add_edge(from, to, id.clone());
        self.arcs.insert(id, edge);
    }

    pub(crate) fn insert_page(&mut self, id: ObjectId, name: Option<&str>) {
        if let Some(name) = name {
            self.names.insert(name.to_owned(), id.clone());
        }
        self.pages.insert(id);
    }
}
