//! Layered (Sugiyama-style) layout over a plain attributed graph.
//!
//! The engine knows nothing about Petri nets: it consumes a [`LayoutGraph`] of
//! sized nodes and directed edges and fills in node centres plus edge bend
//! points. Pipeline:
//! - cycle removal by reversing DFS back edges,
//! - longest-path ranking over a topological order,
//! - dummy vertices for edges spanning several layers,
//! - alternating barycenter sweeps, keeping the ordering with the fewest crossings,
//! - coordinate assignment with every layer centred on the widest one.
//!
//! Results are only written to the graph once every coordinate is known to be finite.
use std::collections::HashSet;

use itertools::Itertools;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsEvent, depth_first_search};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub key: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub key: String,
    pub source: usize,
    pub target: usize,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, key: impl Into<String>, width: f64, height: f64) -> usize {
        self.nodes.push(LayoutNode {
            key: key.into(),
            width,
            height,
            x: 0.0,
            y: 0.0,
        });
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, key: impl Into<String>, source: usize, target: usize) -> usize {
        self.edges.push(LayoutEdge {
            key: key.into(),
            source,
            target,
            points: Vec::new(),
        });
        self.edges.len() - 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ranker {
    #[default]
    LongestPath,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("edge {edge} references node #{index} but the graph only has {nodes} nodes")]
    UnknownEndpoint {
        edge: String,
        index: usize,
        nodes: usize,
    },
    #[error("node {0} has a negative or non-finite size")]
    InvalidSize(String),
    #[error("graph is cyclic (through {0}) and cycle removal is disabled")]
    Cyclic(String),
    #[error("layout produced a non-finite coordinate for {0}")]
    NonFinite(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutSummary {
    pub layers: usize,
    pub crossings: usize,
    pub reversed_edges: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayeredLayout {
    pub ranker: Ranker,
    pub remove_cycles: bool,
    pub iterations: usize,
    pub layer_spacing: f64,
    pub node_spacing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node(usize),
    Dummy,
}

#[derive(Debug, Clone)]
struct Vertex {
    slot: Slot,
    rank: usize,
    width: f64,
    up: Vec<usize>,
    down: Vec<usize>,
}

impl LayeredLayout {
    pub fn run(&self, graph: &mut LayoutGraph) -> Result<LayoutSummary, EngineError> {
        self.validate(graph)?;

        let reversed = self.break_cycles(graph)?;
        let oriented = graph
            .edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.source != edge.target)
            .map(|(idx, edge)| {
                if reversed.contains(&idx) {
                    (edge.target, edge.source, idx)
                } else {
                    (edge.source, edge.target, idx)
                }
            })
            .collect::<Vec<_>>();

        let ranks = match self.ranker {
            Ranker::LongestPath => longest_path_ranks(graph, &oriented)?,
        };

        let (mut vertices, chains) = expand_long_edges(graph, &ranks, &oriented);
        let layer_count = vertices.iter().map(|v| v.rank + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); layer_count];
        for (idx, vertex) in vertices.iter().enumerate() {
            layers[vertex.rank].push(idx);
        }
        for vertex in vertices.iter_mut() {
            vertex.up.sort_unstable();
            vertex.down.sort_unstable();
        }

        let crossings = self.order_layers(&vertices, &mut layers);
        let centres = self.assign_coordinates(graph, &vertices, &layers);

        let mut node_positions = vec![(0.0, 0.0); graph.nodes.len()];
        for (idx, vertex) in vertices.iter().enumerate() {
            if let Slot::Node(node) = vertex.slot {
                node_positions[node] = centres[idx];
            }
        }
        let mut edge_points = vec![Vec::new(); graph.edges.len()];
        for (edge, chain) in chains {
            let mut points = chain.iter().map(|&v| centres[v]).collect::<Vec<_>>();
            if reversed.contains(&edge) {
                points.reverse();
            }
            edge_points[edge] = points;
        }

        for (node, &(x, y)) in graph.nodes.iter().zip(&node_positions) {
            if !x.is_finite() || !y.is_finite() {
                return Err(EngineError::NonFinite(node.key.clone()));
            }
        }
        for (edge, points) in graph.edges.iter().zip(&edge_points) {
            if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
                return Err(EngineError::NonFinite(edge.key.clone()));
            }
        }

        for (node, (x, y)) in graph.nodes.iter_mut().zip(node_positions) {
            node.x = x;
            node.y = y;
        }
        for (edge, points) in graph.edges.iter_mut().zip(edge_points) {
            edge.points = points;
        }

        Ok(LayoutSummary {
            layers: layer_count,
            crossings,
            reversed_edges: reversed.len(),
        })
    }

    fn validate(&self, graph: &LayoutGraph) -> Result<(), EngineError> {
        for node in &graph.nodes {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(node.width) || !valid(node.height) {
                return Err(EngineError::InvalidSize(node.key.clone()));
            }
        }
        let count = graph.nodes.len();
        for edge in &graph.edges {
            for index in [edge.source, edge.target] {
                if index >= count {
                    return Err(EngineError::UnknownEndpoint {
                        edge: edge.key.clone(),
                        index,
                        nodes: count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the indices of edges that must be reversed to make the graph acyclic.
    fn break_cycles(&self, graph: &LayoutGraph) -> Result<HashSet<usize>, EngineError> {
        let mut dag = DiGraph::<usize, usize>::with_capacity(graph.nodes.len(), graph.edges.len());
        for idx in 0..graph.nodes.len() {
            dag.add_node(idx);
        }
        for (idx, edge) in graph.edges.iter().enumerate() {
            if edge.source != edge.target {
                dag.add_edge(NodeIndex::new(edge.source), NodeIndex::new(edge.target), idx);
            }
        }

        let mut back_edges = HashSet::new();
        depth_first_search(&dag, dag.node_indices(), |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                back_edges.insert((from.index(), to.index()));
            }
        });
        if back_edges.is_empty() {
            return Ok(HashSet::new());
        }
        if !self.remove_cycles {
            let through = back_edges
                .iter()
                .map(|&(_, to)| to)
                .min()
                .map(|node| graph.nodes[node].key.clone())
                .unwrap_or_default();
            return Err(EngineError::Cyclic(through));
        }

        Ok(graph
            .edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| back_edges.contains(&(edge.source, edge.target)))
            .map(|(idx, _)| idx)
            .collect())
    }

    /// Alternating barycenter sweeps; the ordering with the fewest crossings wins.
    fn order_layers(&self, vertices: &[Vertex], layers: &mut [Vec<usize>]) -> usize {
        let mut best = layers.to_vec();
        let mut best_crossings = count_crossings(vertices, layers);

        for pass in 0..self.iterations {
            if best_crossings == 0 {
                break;
            }
            if pass % 2 == 0 {
                for rank in 1..layers.len() {
                    let (fixed, free) = layers.split_at_mut(rank);
                    sort_by_barycenter(&mut free[0], &fixed[rank - 1], vertices, |v| &v.up);
                }
            } else {
                for rank in (0..layers.len().saturating_sub(1)).rev() {
                    let (free, fixed) = layers.split_at_mut(rank + 1);
                    sort_by_barycenter(&mut free[rank], &fixed[0], vertices, |v| &v.down);
                }
            }
            let crossings = count_crossings(vertices, layers);
            if crossings < best_crossings {
                best_crossings = crossings;
                best = layers.to_vec();
            }
        }

        layers.clone_from_slice(&best);
        best_crossings
    }

    fn assign_coordinates(
        &self,
        graph: &LayoutGraph,
        vertices: &[Vertex],
        layers: &[Vec<usize>],
    ) -> Vec<(f64, f64)> {
        let layer_width = |layer: &[usize]| -> f64 {
            let widths: f64 = layer.iter().map(|&v| vertices[v].width).sum();
            widths + self.node_spacing * layer.len().saturating_sub(1) as f64
        };
        let widest = layers.iter().map(|l| layer_width(l)).fold(0.0, f64::max);

        let mut centres = vec![(0.0, 0.0); vertices.len()];
        let mut top = self.node_spacing;
        for layer in layers {
            let height = layer
                .iter()
                .filter_map(|&v| match vertices[v].slot {
                    Slot::Node(node) => Some(graph.nodes[node].height),
                    Slot::Dummy => None,
                })
                .fold(0.0, f64::max);
            let y = top + height / 2.0;
            let mut cursor = self.node_spacing + (widest - layer_width(layer)) / 2.0;
            for &v in layer {
                let width = vertices[v].width;
                centres[v] = (cursor + width / 2.0, y);
                cursor += width + self.node_spacing;
            }
            top += height.max(self.node_spacing) + self.layer_spacing;
        }
        centres
    }
}

fn longest_path_ranks(
    graph: &LayoutGraph,
    oriented: &[(usize, usize, usize)],
) -> Result<Vec<usize>, EngineError> {
    let mut dag = DiGraph::<usize, ()>::with_capacity(graph.nodes.len(), oriented.len());
    for idx in 0..graph.nodes.len() {
        dag.add_node(idx);
    }
    for &(from, to, _) in oriented {
        dag.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
    }
    let order = toposort(&dag, None).map_err(|cycle| {
        EngineError::Cyclic(graph.nodes[cycle.node_id().index()].key.clone())
    })?;

    let mut ranks = vec![0usize; graph.nodes.len()];
    for node in order {
        let rank = ranks[node.index()];
        for next in dag.neighbors(node) {
            ranks[next.index()] = ranks[next.index()].max(rank + 1);
        }
    }
    Ok(ranks)
}

/// Splits every edge spanning more than one layer into a chain through dummy vertices.
///
/// Vertex `i < graph.nodes.len()` is graph node `i`; dummies follow. The returned chains
/// list the dummy vertices of each edge from its oriented source to its oriented target.
fn expand_long_edges(
    graph: &LayoutGraph,
    ranks: &[usize],
    oriented: &[(usize, usize, usize)],
) -> (Vec<Vertex>, Vec<(usize, Vec<usize>)>) {
    let mut vertices = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| Vertex {
            slot: Slot::Node(idx),
            rank: ranks[idx],
            width: node.width,
            up: Vec::new(),
            down: Vec::new(),
        })
        .collect::<Vec<_>>();

    let mut chains = Vec::with_capacity(oriented.len());
    for &(from, to, edge) in oriented {
        let mut chain = Vec::new();
        let mut previous = from;
        for rank in ranks[from] + 1..ranks[to] {
            vertices.push(Vertex {
                slot: Slot::Dummy,
                rank,
                width: 0.0,
                up: Vec::new(),
                down: Vec::new(),
            });
            let dummy = vertices.len() - 1;
            vertices[previous].down.push(dummy);
            vertices[dummy].up.push(previous);
            chain.push(dummy);
            previous = dummy;
        }
        vertices[previous].down.push(to);
        vertices[to].up.push(previous);
        chains.push((edge, chain));
    }
    (vertices, chains)
}

fn sort_by_barycenter(
    layer: &mut [usize],
    fixed: &[usize],
    vertices: &[Vertex],
    neighbors: impl Fn(&Vertex) -> &Vec<usize>,
) {
    let mut fixed_position = vec![None; vertices.len()];
    for (pos, &v) in fixed.iter().enumerate() {
        fixed_position[v] = Some(pos as f64);
    }
    let keyed = layer
        .iter()
        .enumerate()
        .map(|(current, &v)| {
            let positions = neighbors(&vertices[v])
                .iter()
                .filter_map(|&n| fixed_position[n])
                .collect::<Vec<_>>();
            let key = if positions.is_empty() {
                current as f64
            } else {
                positions.iter().sum::<f64>() / positions.len() as f64
            };
            (key, v)
        })
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)
        .collect::<Vec<_>>();
    layer.copy_from_slice(&keyed);
}

fn count_crossings(vertices: &[Vertex], layers: &[Vec<usize>]) -> usize {
    let mut position = vec![0usize; vertices.len()];
    for layer in layers {
        for (pos, &v) in layer.iter().enumerate() {
            position[v] = pos;
        }
    }
    layers
        .iter()
        .map(|layer| {
            let segments = layer
                .iter()
                .flat_map(|&v| vertices[v].down.iter().map(move |&w| (v, w)))
                .map(|(v, w)| (position[v], position[w]))
                .collect::<Vec<_>>();
            segments
                .iter()
                .tuple_combinations()
                .filter(|((a0, b0), (a1, b1))| (a0 < a1 && b0 > b1) || (a0 > a1 && b0 < b1))
                .count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> LayeredLayout {
        LayeredLayout {
            ranker: Ranker::LongestPath,
            remove_cycles: true,
            iterations: 30,
            layer_spacing: 80.0,
            node_spacing: 40.0,
        }
    }

    #[test]
    fn chain_is_ranked_top_down() {
        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 40.0, 40.0);
        let b = graph.add_node("b", 40.0, 40.0);
        let c = graph.add_node("c", 40.0, 40.0);
        graph.add_edge("ab", a, b);
        graph.add_edge("bc", b, c);

        let summary = engine().run(&mut graph).unwrap();
        assert_eq!(summary.layers, 3);
        assert_eq!(summary.reversed_edges, 0);
        assert!(graph.nodes[a].y < graph.nodes[b].y);
        assert!(graph.nodes[b].y < graph.nodes[c].y);
        assert!(graph.edges.iter().all(|edge| edge.points.is_empty()));
    }

    #[test]
    fn long_edges_get_bend_points() {
        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 40.0, 40.0);
        let b = graph.add_node("b", 40.0, 40.0);
        let c = graph.add_node("c", 40.0, 40.0);
        graph.add_edge("ab", a, b);
        graph.add_edge("bc", b, c);
        let skip = graph.add_edge("ac", a, c);

        engine().run(&mut graph).unwrap();
        let points = &graph.edges[skip].points;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1, graph.nodes[b].y);
    }

    #[test]
    fn cycles_are_broken_and_bend_points_keep_edge_direction() {
        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 40.0, 40.0);
        let b = graph.add_node("b", 40.0, 40.0);
        let c = graph.add_node("c", 40.0, 40.0);
        graph.add_edge("ab", a, b);
        graph.add_edge("bc", b, c);
        let back = graph.add_edge("ca", c, a);

        let summary = engine().run(&mut graph).unwrap();
        assert_eq!(summary.reversed_edges, 1);
        let points = &graph.edges[back].points;
        assert_eq!(points.len(), 1);
        assert!(graph.nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
    }

    #[test]
    fn cycles_fail_without_removal_and_leave_graph_untouched() {
        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 40.0, 40.0);
        let b = graph.add_node("b", 40.0, 40.0);
        graph.nodes[a].x = 7.0;
        graph.add_edge("ab", a, b);
        graph.add_edge("ba", b, a);
        let before = graph.clone();

        let strict = LayeredLayout {
            remove_cycles: false,
            ..engine()
        };
        assert!(matches!(strict.run(&mut graph), Err(EngineError::Cyclic(_))));
        assert_eq!(graph, before);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut graph = LayoutGraph::new();
        graph.add_node("a", f64::NAN, 1.0);
        assert!(matches!(engine().run(&mut graph), Err(EngineError::InvalidSize(_))));

        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 1.0, 1.0);
        graph.add_edge("dangling", a, 5);
        assert!(matches!(
            engine().run(&mut graph),
            Err(EngineError::UnknownEndpoint { index: 5, .. })
        ));
    }

    #[test]
    fn barycenter_sweeps_remove_avoidable_crossings() {
        let mut graph = LayoutGraph::new();
        let a = graph.add_node("a", 10.0, 10.0);
        let b = graph.add_node("b", 10.0, 10.0);
        let c = graph.add_node("c", 10.0, 10.0);
        let d = graph.add_node("d", 10.0, 10.0);
        graph.add_edge("ad", a, d);
        graph.add_edge("bc", b, c);

        let summary = engine().run(&mut graph).unwrap();
        assert_eq!(summary.crossings, 0);
        assert!((graph.nodes[a].x < graph.nodes[b].x) == (graph.nodes[d].x < graph.nodes[c].x));
    }

    #[test]
    fn layout_is_deterministic() {
        let build = || {
            let mut graph = LayoutGraph::new();
            for key in ["p0", "t0", "p1", "t1"] {
                graph.add_node(key, 40.0, 40.0);
            }
            graph.add_edge("a0", 0, 1);
            graph.add_edge("a1", 1, 2);
            graph.add_edge("a2", 2, 3);
            graph.add_edge("a3", 3, 0);
            graph
        };
        let mut first = build();
        let mut second = build();
        engine().run(&mut first).unwrap();
        engine().run(&mut second).unwrap();
        engine().run(&mut second).unwrap();
        assert_eq!(first, second);
    }
}
