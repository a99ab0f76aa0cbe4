//! 页面自动布局：`engine` 是与网无关的分层布局算法，`driver` 负责在文档与布局图之间搬运几何信息。
pub mod driver;
pub mod engine;

pub use driver::{layout_net, layout_page};
pub use engine::{EngineError, LayeredLayout, LayoutGraph, LayoutSummary, Ranker};
