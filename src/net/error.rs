use thiserror::Error;

use crate::layout::engine::EngineError;
use crate::net::ids::{ObjectId, ObjectKind};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("object identifier must not be empty")]
    EmptyId,
    #[error("identifier {0} is already registered in the document")]
    DuplicateId(ObjectId),
    #[error("name '{name}' is already used inside {scope}")]
    DuplicateName { scope: ObjectId, name: String },

    #[error("arc {arc} references unknown node {endpoint}")]
    UnresolvedEndpoint { arc: ObjectId, endpoint: ObjectId },
    #[error("arc {arc} endpoint {endpoint} does not live on page {page}")]
    EndpointOutsidePage {
        arc: ObjectId,
        endpoint: ObjectId,
        page: ObjectId,
    },
    #[error("an arc from {source_id} to {target_id} already exists")]
    DuplicateArc {
        source_id: ObjectId,
        target_id: ObjectId,
    },
    #[error("node {node} references unknown node {reference}")]
    UnresolvedReference { node: ObjectId, reference: ObjectId },
    #[error("{node_kind} {node} cannot reference {reference_kind} {reference}")]
    ReferenceKindMismatch {
        node: ObjectId,
        node_kind: ObjectKind,
        reference: ObjectId,
        reference_kind: ObjectKind,
    },
    #[error("referencing {reference} from {node} would close a reference cycle")]
    ReferenceCycle { node: ObjectId, reference: ObjectId },

    #[error("no object with identifier {0}")]
    UnknownObject(ObjectId),
    #[error("{0} is not attached to the document")]
    Detached(ObjectId),
    #[error("page {0} has no owning net or page")]
    Orphan(ObjectId),
    #[error("a {parent_kind} cannot contain a {child_kind} (parent {parent})")]
    InvalidChild {
        parent: ObjectId,
        parent_kind: ObjectKind,
        child_kind: ObjectKind,
    },
    #[error("{0} is neither a net nor a page")]
    NotAContainer(ObjectId),
    #[error("{0} is not a place or transition")]
    NotANode(ObjectId),
    #[error("{0} carries a non-finite coordinate")]
    NonFiniteGeometry(ObjectId),

    #[error("layout of page {page} failed: {source}")]
    Layout {
        page: ObjectId,
        #[source]
        source: EngineError,
    },
}
