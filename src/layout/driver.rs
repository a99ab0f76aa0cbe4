use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::layout::engine::{LayeredLayout, LayoutGraph, LayoutSummary};
use crate::net::document::Document;
use crate::net::error::NetError;
use crate::net::ids::ObjectId;
use crate::net::object::Object;
use crate::net::page::Page;
use crate::net::structure::{Arc, Point};

impl From<&LayoutConfig> for LayeredLayout {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            ranker: config.ranker,
            remove_cycles: config.remove_cycles,
            iterations: config.iterations,
            layer_spacing: config.layer_spacing(),
            node_spacing: config.node_spacing(),
        }
    }
}

/// 页面到布局图的转换结果，记录布局图下标与文档标识的对应关系。
struct Exported {
    graph: LayoutGraph,
    nodes: Vec<ObjectId>,
    arcs: Vec<ObjectId>,
}

fn export_page(doc: &Document, page: &Page, config: &LayoutConfig) -> Exported {
    let mut graph = LayoutGraph::new();
    let mut nodes = Vec::with_capacity(page.node_count());
    let mut index_of = HashMap::with_capacity(page.node_count());

    for id in page.nodes() {
        let Some(node) = doc.node(id) else {
            continue;
        };
        let (width, height) = if node.size.x > 0.0 && node.size.y > 0.0 {
            (node.size.x, node.size.y)
        } else {
            (config.node_size, config.node_size)
        };
        let idx = graph.add_node(id.as_str(), width, height);
        graph.nodes[idx].x = node.position.x;
        graph.nodes[idx].y = node.position.y;
        if let Some(vertex) = page.vertex(id) {
            index_of.insert(vertex, idx);
        }
        nodes.push(id.clone());
    }

    let mut arcs = Vec::with_capacity(page.arc_count());
    for id in page.arcs() {
        let endpoints = page
            .edge(id)
            .and_then(|edge| page.adjacency().edge_endpoints(edge))
            .and_then(|(from, to)| Some((*index_of.get(&from)?, *index_of.get(&to)?)));
        let Some((source, target)) = endpoints else {
            continue;
        };
        let idx = graph.add_edge(id.as_str(), source, target);
        if let Some(arc) = doc.get::<Arc>(id) {
            graph.edges[idx].points = arc.curve.iter().map(|p| (p.x, p.y)).collect();
        }
        arcs.push(id.clone());
    }

    Exported { graph, nodes, arcs }
}

/// Lays out the nodes and arcs placed directly on `page`.
///
/// Geometry is written back only when the engine succeeds; on failure the page
/// keeps its previous coordinates.
pub fn layout_page(
    doc: &mut Document,
    page: &str,
    config: &LayoutConfig,
) -> Result<LayoutSummary, NetError> {
    let page_ref = match doc.object(page) {
        Some(Object::Page(page)) => page,
        Some(other) => return Err(NetError::NotAContainer(other.id().clone())),
        None => return Err(NetError::UnknownObject(ObjectId::from(page))),
    };
    let page_id = page_ref.id().clone();
    let Exported {
        mut graph,
        nodes,
        arcs,
    } = export_page(doc, page_ref, config);

    let engine = LayeredLayout::from(config);
    let summary = engine
        .run(&mut graph)
        .map_err(|source| NetError::Layout {
            page: page_id.clone(),
            source,
        })?;

    for (id, laid_out) in nodes.iter().zip(&graph.nodes) {
        doc.set_geometry(
            id,
            Point::new(laid_out.x, laid_out.y),
            Point::new(laid_out.width, laid_out.height),
        )?;
    }
    for (id, laid_out) in arcs.iter().zip(&graph.edges) {
        if let Some(arc) = doc.get_mut::<Arc>(id) {
            arc.curve = laid_out.points.iter().map(|&p| Point::from(p)).collect();
        }
    }

    log::info!(
        "laid out page {page_id}: {} nodes, {} arcs, {} layers, {} crossings",
        nodes.len(),
        arcs.len(),
        summary.layers,
        summary.crossings
    );
    Ok(summary)
}

/// Lays out every page of `net`, nested pages included, in document order.
pub fn layout_net(
    doc: &mut Document,
    net: &str,
    config: &LayoutConfig,
) -> Result<Vec<(ObjectId, LayoutSummary)>, NetError> {
    let mut pending: Vec<ObjectId> = match doc.object(net) {
        Some(Object::Net(net)) => net.pages().cloned().collect(),
        Some(other) => return Err(NetError::NotAContainer(other.id().clone())),
        None => return Err(NetError::UnknownObject(ObjectId::from(net))),
    };

    pending.reverse();

    let mut summaries = Vec::new();
    while let Some(page) = pending.pop() {
        if let Some(current) = doc.get::<Page>(&page) {
            let nested: Vec<ObjectId> = current.pages().cloned().collect();
            pending.extend(nested.into_iter().rev());
        }
        let summary = layout_page(doc, &page, config)?;
        summaries.push((page, summary));
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{NetFormat, PetriNet, Place, Transition};

    fn cycle_net() -> Document {
        let mut doc = Document::new();
        doc.add_net(PetriNet::new("net", NetFormat::PlaceTransition))
            .unwrap();
        doc.add_page("net", Page::new("pg")).unwrap();
        doc.add_page("pg", Page::new("sub")).unwrap();
        doc.add_place("pg", Place::new("p0").with_tokens(1)).unwrap();
        doc.add_transition("pg", Transition::new("t0")).unwrap();
        doc.add_place("pg", Place::new("p1")).unwrap();
        doc.add_transition("pg", Transition::new("t1")).unwrap();
        doc.add_arc("pg", Arc::new("a0", "p0", "t0")).unwrap();
        doc.add_arc("pg", Arc::new("a1", "t0", "p1")).unwrap();
        doc.add_arc("pg", Arc::new("a2", "p1", "t1")).unwrap();
        doc.add_arc("pg", Arc::new("a3", "t1", "p0")).unwrap();
        doc.add_place("sub", Place::new("q")).unwrap();
        doc
    }

    #[test]
    fn layout_writes_back_finite_geometry() {
        let mut doc = cycle_net();
        let summary = layout_page(&mut doc, "pg", &LayoutConfig::default()).unwrap();
        assert_eq!(summary.reversed_edges, 1);

        let p0 = doc.node("p0").unwrap().position;
        let t0 = doc.node("t0").unwrap().position;
        assert!(p0.is_finite() && t0.is_finite());
        assert!(p0.y < t0.y);
        assert_eq!(doc.node("t1").unwrap().size, Point::new(40.0, 40.0));
        assert!(!doc.get::<Arc>("a3").unwrap().curve.is_empty());
    }

    #[test]
    fn relayout_is_idempotent() {
        let mut doc = cycle_net();
        let config = LayoutConfig::default();
        layout_page(&mut doc, "pg", &config).unwrap();
        let first: Vec<_> = ["p0", "t0", "p1", "t1"]
            .iter()
            .map(|id| doc.node(id).unwrap().position)
            .collect();
        let curve = doc.get::<Arc>("a3").unwrap().curve.clone();

        layout_page(&mut doc, "pg", &config).unwrap();
        let second: Vec<_> = ["p0", "t0", "p1", "t1"]
            .iter()
            .map(|id| doc.node(id).unwrap().position)
            .collect();
        assert_eq!(first, second);
        assert_eq!(doc.get::<Arc>("a3").unwrap().curve, curve);
    }

    #[test]
    fn engine_failure_leaves_geometry_untouched() {
        let mut doc = cycle_net();
        doc.set_geometry("p0", Point::new(3.0, 4.0), Point::default())
            .unwrap();
        let strict = LayoutConfig {
            remove_cycles: false,
            ..LayoutConfig::default()
        };
        let err = layout_page(&mut doc, "pg", &strict).unwrap_err();
        assert!(matches!(err, NetError::Layout { .. }));
        assert_eq!(doc.node("p0").unwrap().position, Point::new(3.0, 4.0));
        assert!(doc.get::<Arc>("a3").unwrap().curve.is_empty());
    }

    #[test]
    fn layout_net_visits_nested_pages() {
        let mut doc = cycle_net();
        let summaries = layout_net(&mut doc, "net", &LayoutConfig::default()).unwrap();
        let pages: Vec<_> = summaries.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(pages, vec!["pg", "sub"]);
        assert!(doc.node("q").unwrap().position.is_finite());
        assert!(matches!(
            layout_page(&mut doc, "p0", &LayoutConfig::default()),
            Err(NetError::NotAContainer(_))
        ));
    }
}
