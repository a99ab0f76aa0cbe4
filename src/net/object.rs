//! 文档中存储的对象：以枚举代替基类指针与类型标签下转。
use crate::net::ids::{ObjectId, ObjectKind, Owner};
use crate::net::page::Page;
use crate::net::petri_net::PetriNet;
use crate::net::structure::{Arc, NodeData, Place, Transition};

#[derive(Debug, Clone)]
pub enum Object {
    Net(PetriNet),
    Page(Page),
    Place(Place),
    Transition(Transition),
    Arc(Arc),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Net(_) => ObjectKind::Net,
            Object::Page(_) => ObjectKind::Page,
            Object::Place(_) => ObjectKind::Place,
            Object::Transition(_) => ObjectKind::Transition,
            Object::Arc(_) => ObjectKind::Arc,
        }
    }

    pub fn id(&self) -> &ObjectId {
        match self {
            Object::Net(net) => &net.id,
            Object::Page(page) => &page.id,
            Object::Place(place) => &place.id,
            Object::Transition(transition) => &transition.id,
            Object::Arc(arc) => &arc.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Object::Net(net) => net.name.as_deref(),
            Object::Page(page) => page.name.as_deref(),
            Object::Place(place) => place.name.as_deref(),
            Object::Transition(transition) => transition.name.as_deref(),
            Object::Arc(arc) => arc.name.as_deref(),
        }
    }

    /// Top-level nets belong to the document itself and report no owner.
    pub fn owner(&self) -> Option<&Owner> {
        match self {
            Object::Net(_) => None,
            Object::Page(page) => page.owner.as_ref(),
            Object::Place(place) => place.owner.as_ref(),
            Object::Transition(transition) => transition.owner.as_ref(),
            Object::Arc(arc) => arc.owner.as_ref(),
        }
    }

    pub fn as_node(&self) -> Option<&NodeData> {
        match self {
            Object::Place(place) => Some(&place.node),
            Object::Transition(transition) => Some(&transition.node),
            _ => None,
        }
    }

    pub(crate) fn as_node_mut(&mut self) -> Option<&mut NodeData> {
        match self {
            Object::Place(place) => Some(&mut place.node),
            Object::Transition(transition) => Some(&mut transition.node),
            _ => None,
        }
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        let slot = match self {
            Object::Net(net) => &mut net.name,
            Object::Page(page) => &mut page.name,
            Object::Place(place) => &mut place.name,
            Object::Transition(transition) => &mut transition.name,
            Object::Arc(arc) => &mut arc.name,
        };
        *slot = name;
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        match self {
            Object::Net(_) => {}
            Object::Page(page) => page.owner = Some(owner),
            Object::Place(place) => place.owner = Some(owner),
            Object::Transition(transition) => transition.owner = Some(owner),
            Object::Arc(arc) => arc.owner = Some(owner),
        }
    }
}

/// Capability-checked access to one concrete variant of [`Object`].
pub trait ObjectVariant: Sized {
    fn from_object(object: &Object) -> Option<&Self>;

    fn from_object_mut(object: &mut Object) -> Option<&mut Self>;
}

macro_rules! object_variant {
    ($ty:ident, $variant:ident) => {
        impl ObjectVariant for $ty {
            fn from_object(object: &Object) -> Option<&Self> {
                match object {
                    Object::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
                match object {
                    Object::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Object::$variant(value)
            }
        }
    };
}

object_variant!(PetriNet, Net);
object_variant!(Page, Page);
object_variant!(Place, Place);
object_variant!(Transition, Transition);
object_variant!(Arc, Arc);
