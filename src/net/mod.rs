//! # 层次化 Petri 网文档模型
//!
//! 文档（[`Document`]）按标识符拥有全部对象：网、页面、库所、迁移与弧。
//! 其余所有关系（弧端点、节点引用、页面归属）都只保存标识符，
//! 不持有所有权。
//!
//! 不变量（每次插入时校验，之后始终成立）：
//! * 标识符在整个文档内唯一；
//! * 同一页面或网的直接子对象中，非空名称唯一；
//! * 弧的两个端点在插入时必须是文档中已有的节点；
//! * 节点引用只能指向同类节点，且引用关系无环；
//! * 页面的 `nodes`/`arcs` 表与邻接结构保持一致。
//!
//! ## 示例
//!
//! ```rust
//! use petridoc::net::*;
//!
//! let mut doc = Document::new();
//! doc.add_net(PetriNet::new("net", NetFormat::PlaceTransition)).unwrap();
//! doc.add_page("net", Page::new("page").with_name("P1")).unwrap();
//! doc.add_place("page", Place::new("p0").with_name("p0").with_tokens(1)).unwrap();
//! doc.add_transition("page", Transition::new("t0").with_name("t0")).unwrap();
//! doc.add_arc("page", Arc::new("a0", "p0", "t0")).unwrap();
//!
//! let page = doc.get::<Page>("page").unwrap();
//! assert_eq!(page.successors(&ObjectId::from("p0")), vec![&ObjectId::from("t0")]);
//! assert!(doc.add_place("page", Place::new("p1").with_name("p0")).is_err());
//! ```

pub mod document;
pub mod error;
pub mod ids;
pub mod io;
pub mod object;
pub mod page;
pub mod petri_net;
pub mod structure;

pub use document::Document;
pub use error::NetError;
pub use ids::{ObjectId, ObjectKind, Owner};
pub use object::{Object, ObjectVariant};
pub use page::Page;
pub use petri_net::{NetFormat, PetriNet, UnknownNetFormat};
pub use structure::{Arc, ArcKind, NodeData, Place, Point, Transition, Weight};
