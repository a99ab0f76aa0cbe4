//! 标识注册表：文档是所有对象唯一的所有者。
//!
//! 任何插入都遵循"先校验、后提交"两阶段协议：[`Document::check`] 按固定顺序
//! 短路校验，只有全部通过后才会同时写入注册表、父容器的局部表以及邻接结构。
//! 注册表只增不减，对象从不单独删除。
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::net::error::NetError;
use crate::net::ids::{ObjectId, ObjectKind, Owner};
use crate::net::object::{Object, ObjectVariant};
use crate::net::page::Page;
use crate::net::petri_net::PetriNet;
use crate::net::structure::{Arc, NodeData, Place, Point, Transition};

#[derive(Debug, Clone, Default)]
pub struct Document {
    objects: IndexMap<ObjectId, Object>,
}

/// Empty names are not part of any name scope.
fn scoped_name(name: Option<&str>) -> Option<&str> {
    name.filter(|name| !name.is_empty())
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn object(&self, id: &str) -> Option<&Object> {
        self.objects.get(id)
    }

    /// Typed lookup; `None` when the id is absent or names another kind of object.
    pub fn get<T: ObjectVariant>(&self, id: &str) -> Option<&T> {
        self.objects.get(id).and_then(T::from_object)
    }

    pub fn get_mut<T: ObjectVariant>(&mut self, id: &str) -> Option<&mut T> {
        self.objects.get_mut(id).and_then(T::from_object_mut)
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.objects.get(id).and_then(Object::as_node)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut NodeData> {
        self.objects.get_mut(id).and_then(Object::as_node_mut)
    }

    /// Moves or resizes node `id`. Alias links are only changed through
    /// [`Document::set_reference`].
    pub fn set_geometry(&mut self, id: &str, position: Point, size: Point) -> Result<(), NetError> {
        let node = match self.objects.get_mut(id) {
            Some(object) => object
                .as_node_mut()
                .ok_or_else(|| NetError::NotANode(ObjectId::from(id)))?,
            None => return Err(NetError::UnknownObject(ObjectId::from(id))),
        };
        if !position.is_finite() || !size.is_finite() {
            return Err(NetError::NonFiniteGeometry(ObjectId::from(id)));
        }
        node.position = position;
        node.size = size;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn nets(&self) -> impl Iterator<Item = &PetriNet> {
        self.objects.values().filter_map(PetriNet::from_object)
    }

    pub fn find_by_name(&self, scope: &str, name: &str) -> Option<&Object> {
        self.names_of(scope)?
            .get(name)
            .and_then(|id| self.objects.get(id))
    }

    /// Walks owner links up to the net that (transitively) contains `id`.
    pub fn net_of(&self, id: &str) -> Option<&ObjectId> {
        let mut current = self.objects.get(id)?;
        loop {
            match current {
                Object::Net(net) => return Some(&net.id),
                other => current = self.objects.get(other.owner()?.id().as_str())?,
            }
        }
    }

    pub fn add_net(&mut self, net: PetriNet) -> Result<ObjectId, NetError> {
        if net.id.is_empty() {
            return Err(NetError::EmptyId);
        }
        let id = net.id.clone();
        self.register(Object::Net(net))?;
        log::debug!("admitted net {id}");
        Ok(id)
    }

    pub fn add_page(&mut self, parent: &str, page: Page) -> Result<ObjectId, NetError> {
        self.add(parent, page)
    }

    pub fn add_place(&mut self, page: &str, place: Place) -> Result<ObjectId, NetError> {
        self.add(page, place)
    }

    pub fn add_transition(
        &mut self,
        page: &str,
        transition: Transition,
    ) -> Result<ObjectId, NetError> {
        self.add(page, transition)
    }

    pub fn add_arc(&mut self, page: &str, arc: Arc) -> Result<ObjectId, NetError> {
        self.add(page, arc)
    }

    /// Admits a detached object into `parent` (a net or a page).
    ///
    /// Nothing is written unless every check in [`Document::check`] passes.
    ///
    /// Arc endpoints are resolved on the arc's own page only, not on whichever
    /// page owns each endpoint: an endpoint placed elsewhere is rejected with
    /// [`NetError::EndpointOutsidePage`]. Links between pages go through
    /// reference nodes.
    pub fn add(&mut self, parent: &str, object: impl Into<Object>) -> Result<ObjectId, NetError> {
        let object = object.into();
        if let Err(err) = self.check(parent, &object) {
            log::debug!("rejected {} {}: {err}", object.kind(), object.id());
            return Err(err);
        }
        self.commit(parent, object)
    }

    /// Validation half of [`Document::add`], short-circuiting at the first failure.
    pub fn check(&self, parent: &str, object: &Object) -> Result<(), NetError> {
        let id = object.id();
        if id.is_empty() {
            return Err(NetError::EmptyId);
        }
        let container = self
            .objects
            .get(parent)
            .ok_or_else(|| NetError::Detached(ObjectId::from(parent)))?;

        let child_kind = object.kind();
        let names = match container {
            Object::Net(net) if child_kind == ObjectKind::Page => &net.names,
            Object::Page(page) if child_kind != ObjectKind::Net => {
                if page.owner.is_none() {
                    return Err(NetError::Orphan(page.id.clone()));
                }
                &page.names
            }
            other => {
                return Err(NetError::InvalidChild {
                    parent: other.id().clone(),
                    parent_kind: other.kind(),
                    child_kind,
                });
            }
        };

        if self.contains(id) {
            return Err(NetError::DuplicateId(id.clone()));
        }
        if let Some(name) = scoped_name(object.name()) {
            if names.contains_key(name) {
                return Err(NetError::DuplicateName {
                    scope: container.id().clone(),
                    name: name.to_owned(),
                });
            }
        }

        match (object, container) {
            (Object::Place(place), _) => {
                self.check_node(id, ObjectKind::Place, &place.node)?;
                self.check_place(place)
            }
            (Object::Transition(transition), _) => {
                self.check_node(id, ObjectKind::Transition, &transition.node)
            }
            (Object::Arc(arc), Object::Page(page)) => self.check_arc(page, arc),
            _ => Ok(()),
        }
    }

    fn check_node(&self, id: &ObjectId, kind: ObjectKind, node: &NodeData) -> Result<(), NetError> {
        if !node.is_finite() {
            return Err(NetError::NonFiniteGeometry(id.clone()));
        }
        let Some(reference) = node.reference.as_ref() else {
            return Ok(());
        };
        let original = self
            .objects
            .get(reference.as_str())
            .ok_or_else(|| NetError::UnresolvedReference {
                node: id.clone(),
                reference: reference.clone(),
            })?;
        if original.kind() != kind {
            return Err(NetError::ReferenceKindMismatch {
                node: id.clone(),
                node_kind: kind,
                reference: reference.clone(),
                reference_kind: original.kind(),
            });
        }
        Ok(())
    }

    fn check_place(&self, place: &Place) -> Result<(), NetError> {
        if !place.marking_offset.is_finite() {
            return Err(NetError::NonFiniteGeometry(place.id.clone()));
        }
        Ok(())
    }

    fn check_arc(&self, page: &Page, arc: &Arc) -> Result<(), NetError> {
        if arc.curve.iter().any(|point| !point.is_finite()) {
            return Err(NetError::NonFiniteGeometry(arc.id.clone()));
        }
        let from = self.resolve_endpoint(page, arc, &arc.source)?;
        let to = self.resolve_endpoint(page, arc, &arc.target)?;
        if page.graph.find_edge(from, to).is_some() {
            return Err(NetError::DuplicateArc {
                source_id: arc.source.clone(),
                target_id: arc.target.clone(),
            });
        }
        Ok(())
    }

    fn resolve_endpoint(
        &self,
        page: &Page,
        arc: &Arc,
        endpoint: &ObjectId,
    ) -> Result<petgraph::stable_graph::NodeIndex, NetError> {
        if self.node(endpoint).is_none() {
            return Err(NetError::UnresolvedEndpoint {
                arc: arc.id.clone(),
                endpoint: endpoint.clone(),
            });
        }
        page.vertex(endpoint)
            .ok_or_else(|| NetError::EndpointOutsidePage {
                arc: arc.id.clone(),
                endpoint: endpoint.clone(),
                page: page.id.clone(),
            })
    }

    fn register(&mut self, object: Object) -> Result<(), NetError> {
        match self.objects.entry(object.id().clone()) {
            Entry::Occupied(entry) => Err(NetError::DuplicateId(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(object);
                Ok(())
            }
        }
    }

    fn commit(&mut self, parent: &str, mut object: Object) -> Result<ObjectId, NetError> {
        let id = object.id().clone();
        let name = scoped_name(object.name()).map(str::to_owned);
        let kind = object.kind();
        let reference = object.as_node().and_then(|node| node.reference.clone());
        let endpoints = match &object {
            Object::Arc(arc) => Some((arc.source.clone(), arc.target.clone())),
            _ => None,
        };

        let owner = match self.objects.get(parent) {
            Some(Object::Net(net)) => Owner::Net(net.id.clone()),
            Some(Object::Page(page)) => Owner::Page(page.id.clone()),
            _ => return Err(NetError::Detached(ObjectId::from(parent))),
        };
        object.set_owner(owner);
        // 逆引用集合只由文档维护，外部带入的内容一律丢弃。
        if let Some(node) = object.as_node_mut() {
            node.referenced_by.clear();
        }
        self.register(object)?;

        match self.objects.get_mut(parent) {
            Some(Object::Net(net)) => net.insert_page(id.clone(), name.as_deref()),
            Some(Object::Page(page)) => match (kind, endpoints) {
                (ObjectKind::Place | ObjectKind::Transition, _) => {
                    page.insert_node(id.clone(), name.as_deref())
                }
                (ObjectKind::Arc, Some((source, target))) => {
                    if let (Some(from), Some(to)) = (page.vertex(&source), page.vertex(&target)) {
                        page.insert_arc(id.clone(), name.as_deref(), from, to);
                    }
                }
                _ => page.insert_page(id.clone(), name.as_deref()),
            },
            _ => {}
        }

        if let Some(reference) = reference {
            if let Some(original) = self.node_mut(&reference) {
                original.referenced_by.insert(id.clone());
            }
        }

        log::debug!("admitted {kind} {id} into {parent}");
        Ok(id)
    }

    fn names_of(&self, scope: &str) -> Option<&IndexMap<String, ObjectId>> {
        match self.objects.get(scope)? {
            Object::Net(net) => Some(&net.names),
            Object::Page(page) => Some(&page.names),
            _ => None,
        }
    }

    fn names_of_mut(&mut self, scope: &str) -> Option<&mut IndexMap<String, ObjectId>> {
        match self.objects.get_mut(scope)? {
            Object::Net(net) => Some(&mut net.names),
            Object::Page(page) => Some(&mut page.names),
            _ => None,
        }
    }

    /// Renames `id` in place, keeping its parent's name scope consistent.
    pub fn set_name(&mut self, id: &str, name: Option<String>) -> Result<(), NetError> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| NetError::UnknownObject(ObjectId::from(id)))?;
        let object_id = object.id().clone();
        let new = name.filter(|name| !name.is_empty());
        let old = scoped_name(object.name()).map(str::to_owned);
        let scope = object.owner().map(|owner| owner.id().clone());

        if let (Some(scope), Some(new)) = (scope.as_ref(), new.as_ref()) {
            let taken = self
                .names_of(scope)
                .and_then(|names| names.get(new.as_str()))
                .is_some_and(|holder| *holder != object_id);
            if taken {
                return Err(NetError::DuplicateName {
                    scope: scope.clone(),
                    name: new.clone(),
                });
            }
        }

        if let Some(names) = scope.as_ref().and_then(|scope| self.names_of_mut(scope)) {
            if let Some(old) = old.as_deref() {
                names.shift_remove(old);
            }
            if let Some(new) = new.as_ref() {
                names.insert(new.clone(), object_id.clone());
            }
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.set_name(new);
        }
        Ok(())
    }

    /// Points node `id` at `reference` (or clears it), maintaining the inverse sets.
    ///
    /// References must name a node of the same kind and may not form a cycle.
    pub fn set_reference(&mut self, id: &str, reference: Option<ObjectId>) -> Result<(), NetError> {
        let object = self
            .objects
            .get(id)
            .ok_or_else(|| NetError::UnknownObject(ObjectId::from(id)))?;
        let node_id = object.id().clone();
        let kind = object.kind();
        let old = object
            .as_node()
            .ok_or_else(|| NetError::NotANode(node_id.clone()))?
            .reference
            .clone();

        if let Some(target) = reference.as_ref() {
            let original = self.objects.get(target.as_str()).ok_or_else(|| {
                NetError::UnresolvedReference {
                    node: node_id.clone(),
                    reference: target.clone(),
                }
            })?;
            if original.kind() != kind {
                return Err(NetError::ReferenceKindMismatch {
                    node: node_id,
                    node_kind: kind,
                    reference: target.clone(),
                    reference_kind: original.kind(),
                });
            }
            let mut cursor = Some(target.clone());
            while let Some(current) = cursor {
                if current == node_id {
                    return Err(NetError::ReferenceCycle {
                        node: node_id,
                        reference: target.clone(),
                    });
                }
                cursor = self.node(&current).and_then(|node| node.reference.clone());
            }
        }

        if old == reference {
            return Ok(());
        }
        if let Some(previous) = old.as_ref() {
            if let Some(node) = self.node_mut(previous) {
                node.referenced_by.remove(&node_id);
            }
        }
        if let Some(target) = reference.as_ref() {
            if let Some(node) = self.node_mut(target) {
                node.referenced_by.insert(node_id.clone());
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.reference = reference;
        }
        Ok(())
    }
}
