//! 网的静态结构元素：库所、迁移、弧以及节点公共几何信息。
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::net::ids::{ObjectId, Owner};

pub type Weight = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// 库所与迁移共享的部分：位置、尺寸以及引用（别名）关系。
///
/// `reference` 指向同类节点的"原件"；`referenced_by` 是其逆关系，
/// 只由 [`Document`](crate::net::Document) 维护。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub position: Point,
    pub size: Point,
    pub(crate) reference: Option<ObjectId>,
    pub(crate) referenced_by: BTreeSet<ObjectId>,
}

impl NodeData {
    pub fn reference(&self) -> Option<&ObjectId> {
        self.reference.as_ref()
    }

    pub fn referenced_by(&self) -> &BTreeSet<ObjectId> {
        &self.referenced_by
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.position.is_finite() && self.size.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub(crate) id: ObjectId,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<Owner>,
    pub(crate) node: NodeData,
    pub tokens: Weight,
    pub marking_offset: Point,
}

impl Place {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner: None,
            node: NodeData::default(),
            tokens: 0,
            marking_offset: Point::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tokens(mut self, tokens: Weight) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.node.position = Point::new(x, y);
        self
    }

    /// 构造一个引用 `original` 的库所；引用在加入文档时校验。
    pub fn with_reference(mut self, original: impl Into<ObjectId>) -> Self {
        self.node.reference = Some(original.into());
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

    pub fn node(&self) -> &NodeData {
        &self.node
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub(crate) id: ObjectId,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<Owner>,
    pub(crate) node: NodeData,
}

impl Transition {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner: None,
            node: NodeData::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.node.position = Point::new(x, y);
        self
    }

    pub fn with_reference(mut self, original: impl Into<ObjectId>) -> Self {
        self.node.reference = Some(original.into());
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

    pub fn node(&self) -> &NodeData {
        &self.node
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcKind {
    #[default]
    Normal,
    /// 读弧：不消耗托肯，可视化时画成双向。
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub(crate) id: ObjectId,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<Owner>,
    pub(crate) source: ObjectId,
    pub(crate) target: ObjectId,
    pub kind: ArcKind,
    pub curve: Vec<Point>,
}

impl Arc {
    pub fn new(
        id: impl Into<ObjectId>,
        source: impl Into<ObjectId>,
        target: impl Into<ObjectId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner: None,
            source: source.into(),
            target: target.into(),
            kind: ArcKind::Normal,
            curve: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: ArcKind) -> Self {
        self.kind = kind;
        self
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

    pub fn source(&self) -> &ObjectId {
        &self.source
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }
}
