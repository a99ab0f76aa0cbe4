//! 文档统计与页面连通性诊断。
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::net::document::Document;
use crate::net::error::NetError;
use crate::net::ids::{ObjectId, ObjectKind, Owner};
use crate::net::object::Object;
use crate::net::page::Page;
use crate::net::structure::Place;

/// 按对象类别计数的文档概览
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub nets: usize,
    pub pages: usize,
    pub places: usize,
    pub transitions: usize,
    pub arcs: usize,
    /// 作为别名（带 `reference`）的库所与迁移数
    pub reference_nodes: usize,
    /// 初始标记总数，只统计非别名库所；溢出时饱和于 `u64::MAX`
    pub initial_tokens: u64,
}

impl DocumentStats {
    pub fn collect(doc: &Document) -> Self {
        let mut stats = Self::default();
        for object in doc.iter() {
            match object.kind() {
                ObjectKind::Net => stats.nets += 1,
                ObjectKind::Page => stats.pages += 1,
                ObjectKind::Place => stats.places += 1,
                ObjectKind::Transition => stats.transitions += 1,
                ObjectKind::Arc => stats.arcs += 1,
            }
            if object.as_node().is_some_and(|node| node.reference().is_some()) {
                stats.reference_nodes += 1;
            } else if let Object::Place(place) = object {
                stats.initial_tokens = stats.initial_tokens.saturating_add(place.tokens);
            }
        }
        stats
    }
}

impl fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nets:            {}", self.nets)?;
        writeln!(f, "pages:           {}", self.pages)?;
        writeln!(f, "places:          {}", self.places)?;
        writeln!(f, "transitions:     {}", self.transitions)?;
        writeln!(f, "arcs:            {}", self.arcs)?;
        writeln!(f, "reference nodes: {}", self.reference_nodes)?;
        write!(f, "initial tokens:  {}", self.initial_tokens)
    }
}

/// 页面连通性诊断报告
///
/// 一个节点与它的全部别名视为同一个节点：只要别名组中任一成员在其所在页面上有弧，
/// 该节点就不算孤立。
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub page: ObjectId,
    /// 孤立库所（别名组内没有任何弧）
    pub isolated_places: Vec<ObjectId>,
    /// 孤立变迁
    pub isolated_transitions: Vec<ObjectId>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== 页面 {} 连通性诊断 ===", self.page)?;
        writeln!(
            f,
            "总计: {} 个库所, {} 个变迁",
            self.total_places, self.total_transitions
        )?;
        if !self.isolated_places.is_empty() {
            writeln!(f, "孤立库所 ({}):", self.isolated_places.len())?;
            for id in &self.isolated_places {
                writeln!(f, "  - {id}")?;
            }
        }
        if !self.isolated_transitions.is_empty() {
            writeln!(f, "孤立变迁 ({}):", self.isolated_transitions.len())?;
            for id in &self.isolated_transitions {
                writeln!(f, "  - {id}")?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "警告 ({}):", self.warnings.len())?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }
        Ok(())
    }
}

/// 节点及其所有别名：先沿 `reference` 找到原件，再展开 `referenced_by`。
fn alias_class<'a>(doc: &'a Document, id: &'a ObjectId) -> BTreeSet<&'a ObjectId> {
    let mut root = id;
    while let Some(next) = doc.node(root).and_then(|node| node.reference()) {
        root = next;
    }
    let mut class = BTreeSet::new();
    let mut pending = vec![root];
    while let Some(current) = pending.pop() {
        if !class.insert(current) {
            continue;
        }
        if let Some(node) = doc.node(current) {
            pending.extend(node.referenced_by());
        }
    }
    class
}

/// (是否有输入弧, 是否有输出弧)，在整个别名组上统计。
fn connectivity(doc: &Document, id: &ObjectId) -> (bool, bool) {
    let mut has_input = false;
    let mut has_output = false;
    for member in alias_class(doc, id) {
        let Some(Owner::Page(page)) = doc.object(member).and_then(Object::owner) else {
            continue;
        };
        let Some(page) = doc.get::<Page>(page) else {
            continue;
        };
        has_input |= !page.predecessors(member).is_empty();
        has_output |= !page.successors(member).is_empty();
    }
    (has_input, has_output)
}

/// Checks the nodes placed directly on `page` for missing connections.
pub fn diagnose_page(doc: &Document, page: &str) -> Result<DiagnosticReport, NetError> {
    let page = match doc.object(page) {
        Some(Object::Page(page)) => page,
        Some(other) => return Err(NetError::NotAContainer(other.id().clone())),
        None => return Err(NetError::UnknownObject(ObjectId::from(page))),
    };

    let mut report = DiagnosticReport {
        page: page.id().clone(),
        isolated_places: Vec::new(),
        isolated_transitions: Vec::new(),
        warnings: Vec::new(),
        total_places: 0,
        total_transitions: 0,
    };
    for id in page.nodes() {
        let (has_input, has_output) = connectivity(doc, id);
        match doc.object(id) {
            Some(Object::Place(place)) => {
                report.total_places += 1;
                if !has_input && !has_output {
                    report.isolated_places.push(id.clone());
                } else if !has_input && initial_tokens(doc, place) == 0 {
                    report
                        .warnings
                        .push(format!("库所 {id} 无输入弧且初始标记为 0，永远不会被激活"));
                }
            }
            Some(Object::Transition(_)) => {
                report.total_transitions += 1;
                if !has_input && !has_output {
                    report.isolated_transitions.push(id.clone());
                } else if !has_input {
                    report.warnings.push(format!("变迁 {id} 无前置库所，永远无法触发"));
                } else if !has_output {
                    report
                        .warnings
                        .push(format!("变迁 {id} 无后置库所，检查是否为预期行为"));
                }
            }
            _ => {}
        }
    }
    Ok(report)
}

/// 别名库所的标记取自原件。
fn initial_tokens(doc: &Document, place: &Place) -> u64 {
    let mut current = place;
    while let Some(next) = current.node.reference().and_then(|id| doc.get::<Place>(id)) {
        current = next;
    }
    current.tokens
}

pub fn log_diagnostics(report: &DiagnosticReport) {
    if !report.has_issues() {
        log::info!("页面 {} 连通性检查通过，无孤立节点", report.page);
        return;
    }
    log::warn!("=== 页面 {} 连通性诊断 ===", report.page);
    log::warn!(
        "总计: {} 个库所, {} 个变迁",
        report.total_places,
        report.total_transitions
    );
    if !report.isolated_places.is_empty() {
        log::warn!("发现 {} 个孤立库所:", report.isolated_places.len());
        for id in &report.isolated_places {
            log::warn!("  - {id}");
        }
    }
    if !report.isolated_transitions.is_empty() {
        log::warn!("发现 {} 个孤立变迁:", report.isolated_transitions.len());
        for id in &report.isolated_transitions {
            log::warn!("  - {id}");
        }
    }
    for warning in &report.warnings {
        log::warn!("  - {warning}");
    }
}
