//! Directed hierarchical layout.
//!
//! Nodes are ranked along a cycle-broken visiting order: every node is visited
//! exactly once, so cyclic input always terminates. In the acyclic part of the
//! graph an ancestor always sits on a shallower rank than anything reachable
//! from it.

use std::collections::{HashMap, VecDeque};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;
use serde::Deserialize;

use super::surface::{Bounds, Point, Size};
use super::types::SanitizedGraph;

const NODE_GAP: f64 = 24.0;
const RANK_GAP: f64 = 48.0;
const RELAX_STEPS: usize = 120;
const RELAX_DT: f32 = 0.016;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How node positions are computed.
pub enum LayoutAlgorithm {
	/// Delegators above delegates, one row per rank.
	#[default]
	Breadthfirst,
	/// Breadthfirst ranks, then a short force simulation spreads each row.
	ForceRelaxed,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
/// Layout and fit settings.
pub struct LayoutOptions {
	/// Positioning strategy.
	pub algorithm: LayoutAlgorithm,
	/// Rank along edge direction; otherwise edges are treated as undirected.
	pub directed: bool,
	/// Screen-space margin kept around the graph when fitting.
	pub padding: f64,
	/// Multiplies node and rank gaps.
	pub spacing_factor: f64,
	/// Ease nodes from their old positions on relayout.
	pub animate: bool,
	/// Seconds.
	pub animation_duration: f64,
	/// Fit the graph to the surface after layout.
	pub fit: bool,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			algorithm: LayoutAlgorithm::Breadthfirst,
			directed: true,
			padding: 10.0,
			spacing_factor: 1.2,
			animate: true,
			animation_duration: 0.5,
			fit: true,
		}
	}
}

/// Where one node sits, in graph space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
	/// Box centre.
	pub center: Point,
	/// Box size from the wrapped label.
	pub size: Size,
	/// Row, counted from the top.
	pub rank: usize,
}

/// Positioned nodes, index-aligned with [`SanitizedGraph::nodes`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	/// One per node.
	pub placements: Vec<Placement>,
	/// Number of rows.
	pub rank_count: usize,
}

impl Layout {
	/// Smallest box around every node, `None` for an empty layout.
	pub fn bounds(&self) -> Option<Bounds> {
		self.placements
			.iter()
			.map(|p| Bounds::around(p.center, p.size))
			.reduce(Bounds::union)
	}

	/// Row of node `index`.
	pub fn rank(&self, index: usize) -> Option<usize> {
		self.placements.get(index).map(|p| p.rank)
	}

	/// Node indices of each rank, left to right.
	pub fn rows(&self) -> Vec<Vec<usize>> {
		let mut rows = vec![Vec::new(); self.rank_count];
		for (index, placement) in self.placements.iter().enumerate() {
			rows[placement.rank].push(index);
		}
		for row in &mut rows {
			row.sort_by(|&a, &b| {
				self.placements[a]
					.center
					.x
					.total_cmp(&self.placements[b].center.x)
			});
		}
		rows
	}
}

/// Place `graph`'s nodes. `sizes` is index-aligned with the graph's nodes.
pub fn layout(graph: &SanitizedGraph, sizes: &[Size], options: &LayoutOptions) -> Layout {
	let n = graph.nodes.len();
	if n == 0 {
		return Layout::default();
	}
	let index: HashMap<&str, usize> = graph
		.nodes
		.iter()
		.enumerate()
		.map(|(i, node)| (node.id.as_str(), i))
		.collect();
	let links: Vec<(usize, usize)> = graph
		.edges
		.iter()
		.filter(|edge| !edge.is_self_loop())
		.filter_map(|edge| Some((*index.get(edge.source.as_str())?, *index.get(edge.target.as_str())?)))
		.collect();

	let (order, ranks) = if options.directed {
		directed_ranks(n, &links)
	} else {
		undirected_ranks(n, &links)
	};
	let rank_count = ranks.iter().copied().max().map_or(0, |deepest| deepest + 1);
	let rows = order_rows(&order, &ranks, rank_count, &links);

	let size_of = |i: usize| sizes.get(i).copied().unwrap_or_default();
	let widest = (0..n).map(|i| size_of(i).width).fold(0.0, f64::max);
	let tallest = (0..n).map(|i| size_of(i).height).fold(0.0, f64::max);
	let column = (widest + NODE_GAP) * options.spacing_factor;
	let row_height = (tallest + RANK_GAP) * options.spacing_factor;

	let mut placements = vec![
		Placement {
			center: Point::default(),
			size: Size::default(),
			rank: 0,
		};
		n
	];
	for (rank, row) in rows.iter().enumerate() {
		let offset = (row.len() as f64 - 1.0) / 2.0;
		for (slot, &i) in row.iter().enumerate() {
			placements[i] = Placement {
				center: Point::new((slot as f64 - offset) * column, rank as f64 * row_height),
				size: size_of(i),
				rank,
			};
		}
	}

	if options.algorithm == LayoutAlgorithm::ForceRelaxed {
		relax_rows(&mut placements, &links);
	}

	debug!("layout placed {n} nodes on {rank_count} ranks ({:?})", options.algorithm);
	Layout {
		placements,
		rank_count,
	}
}

/// Kahn order over in-degree. When only cycles remain, the earliest-reached
/// unvisited node (one with a visited predecessor) continues the walk; only
/// cycles nothing visited reaches start from the first unvisited node in node
/// order. Rank is the longest path along edges that go forward in that order;
/// edges pointing backwards close cycles and are ignored for ranking.
fn directed_ranks(n: usize, links: &[(usize, usize)]) -> (Vec<usize>, Vec<usize>) {
	let mut successors = vec![Vec::new(); n];
	let mut in_degree = vec![0usize; n];
	for &(s, t) in links {
		successors[s].push(t);
		in_degree[t] += 1;
	}

	let mut visited = vec![false; n];
	let mut order = Vec::with_capacity(n);
	let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
	// Nodes reached from a visited node, in discovery order.
	let mut reached = Vec::new();
	let (mut next_reached, mut next_root) = (0, 0);
	loop {
		while let Some(u) = queue.pop_front() {
			if visited[u] {
				continue;
			}
			visited[u] = true;
			order.push(u);
			for &v in &successors[u] {
				if !visited[v] {
					reached.push(v);
					in_degree[v] -= 1;
					if in_degree[v] == 0 {
						queue.push_back(v);
					}
				}
			}
		}
		while next_reached < reached.len() && visited[reached[next_reached]] {
			next_reached += 1;
		}
		if let Some(&entry) = reached.get(next_reached) {
			queue.push_back(entry);
			continue;
		}
		while next_root < n && visited[next_root] {
			next_root += 1;
		}
		if next_root == n {
			break;
		}
		queue.push_back(next_root);
	}

	let mut position = vec![0; n];
	for (pos, &u) in order.iter().enumerate() {
		position[u] = pos;
	}
	let mut ranks = vec![0; n];
	for &u in &order {
		for &v in &successors[u] {
			if position[u] < position[v] {
				ranks[v] = ranks[v].max(ranks[u] + 1);
			}
		}
	}
	(order, ranks)
}

/// Breadth-first depth over edges in both directions; first discovery wins.
fn undirected_ranks(n: usize, links: &[(usize, usize)]) -> (Vec<usize>, Vec<usize>) {
	let mut neighbours = vec![Vec::new(); n];
	for &(s, t) in links {
		neighbours[s].push(t);
		neighbours[t].push(s);
	}
	let mut ranks = vec![usize::MAX; n];
	let mut order = Vec::with_capacity(n);
	for root in 0..n {
		if ranks[root] != usize::MAX {
			continue;
		}
		ranks[root] = 0;
		let mut queue = VecDeque::from([root]);
		while let Some(u) = queue.pop_front() {
			order.push(u);
			for &v in &neighbours[u] {
				if ranks[v] == usize::MAX {
					ranks[v] = ranks[u] + 1;
					queue.push_back(v);
				}
			}
		}
	}
	(order, ranks)
}

/// Group nodes by rank in visiting order, then sort each row below the first
/// by the mean slot of the node's parents on shallower rows.
fn order_rows(order: &[usize], ranks: &[usize], rank_count: usize, links: &[(usize, usize)]) -> Vec<Vec<usize>> {
	let mut rows = vec![Vec::new(); rank_count];
	for &u in order {
		rows[ranks[u]].push(u);
	}
	let mut slot = vec![0.0; ranks.len()];
	for rank in 0..rank_count {
		if rank > 0 {
			let mut keyed: Vec<(f64, usize)> = rows[rank]
				.iter()
				.enumerate()
				.map(|(fallback, &v)| {
					let parents: Vec<f64> = links
						.iter()
						.filter(|&&(s, t)| t == v && ranks[s] < rank)
						.map(|&(s, _)| slot[s])
						.collect();
					if parents.is_empty() {
						(fallback as f64, v)
					} else {
						(parents.iter().sum::<f64>() / parents.len() as f64, v)
					}
				})
				.collect();
			keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
			rows[rank] = keyed.into_iter().map(|(_, v)| v).collect();
		}
		for (position, &v) in rows[rank].iter().enumerate() {
			slot[v] = position as f64;
		}
	}
	rows
}

/// Run a fixed number of force simulation steps with every node pinned to its
/// row, then keep the horizontal result.
fn relax_rows(placements: &mut [Placement], links: &[(usize, usize)]) {
	let mut graph: ForceGraph<usize, ()> = ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	});
	let handles: Vec<DefaultNodeIdx> = placements
		.iter()
		.enumerate()
		.map(|(i, p)| {
			graph.add_node(NodeData {
				x: p.center.x as f32,
				y: p.center.y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: i,
			})
		})
		.collect();
	for &(s, t) in links {
		graph.add_edge(handles[s], handles[t], EdgeData::default());
	}

	let rows: Vec<f32> = placements.iter().map(|p| p.center.y as f32).collect();
	for _ in 0..RELAX_STEPS {
		graph.update(RELAX_DT);
		graph.visit_nodes_mut(|node| {
			node.data.y = rows[node.data.user_data];
		});
	}
	graph.visit_nodes(|node| {
		let x = node.x() as f64;
		if x.is_finite() {
			placements[node.data.user_data].center.x = x;
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::round_graph::types::{DelegationEdge, ParticipantNode};

	fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> SanitizedGraph {
		SanitizedGraph {
			nodes: nodes
				.iter()
				.map(|id| ParticipantNode {
					id: (*id).into(),
					label: (*id).into(),
					is_placeholder: false,
				})
				.collect(),
			edges: edges
				.iter()
				.enumerate()
				.map(|(i, (s, t))| DelegationEdge {
					id: format!("e{i}"),
					source: (*s).into(),
					target: (*t).into(),
				})
				.collect(),
		}
	}

	fn run(g: &SanitizedGraph) -> Layout {
		let sizes = vec![Size::new(40.0, 30.0); g.nodes.len()];
		layout(g, &sizes, &LayoutOptions::default())
	}

	fn rank(g: &SanitizedGraph, l: &Layout, id: &str) -> usize {
		let i = g.nodes.iter().position(|n| n.id == id).unwrap();
		l.rank(i).unwrap()
	}

	#[test]
	fn empty_graph_has_no_bounds() {
		let l = run(&graph(&[], &[]));
		assert!(l.placements.is_empty());
		assert!(l.bounds().is_none());
	}

	#[test]
	fn chain_descends_one_rank_per_hop() {
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		let l = run(&g);
		assert_eq!(l.rank_count, 3);
		assert_eq!([rank(&g, &l, "a"), rank(&g, &l, "b"), rank(&g, &l, "c")], [0, 1, 2]);
		assert!(l.placements[0].center.y < l.placements[1].center.y);
	}

	#[test]
	fn ancestors_stay_above_descendants_with_several_roots() {
		// a -> b -> c -> e and d -> e: e must sit below c, not beside it.
		let g = graph(
			&["a", "d", "b", "c", "e"],
			&[("a", "b"), ("b", "c"), ("c", "e"), ("d", "e")],
		);
		let l = run(&g);
		assert_eq!(rank(&g, &l, "a"), 0);
		assert_eq!(rank(&g, &l, "d"), 0);
		assert!(rank(&g, &l, "c") < rank(&g, &l, "e"));
	}

	#[test]
	fn cycles_terminate_and_keep_entry_shallow() {
		let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
		let l = run(&g);
		assert_eq!([rank(&g, &l, "a"), rank(&g, &l, "b"), rank(&g, &l, "c")], [0, 1, 2]);

		let ring = graph(&["x", "y", "z"], &[("x", "y"), ("y", "z"), ("z", "x")]);
		let l = run(&ring);
		assert_eq!(l.placements.len(), 3);
		assert_eq!(rank(&ring, &l, "x"), 0);
	}

	#[test]
	fn cycle_listed_before_its_root_still_hangs_below_it() {
		// 4 -> 2 <-> 1, with the cycle member 1 first in node order.
		let g = graph(&["1", "2", "4"], &[("4", "2"), ("2", "1"), ("1", "2")]);
		let l = run(&g);
		assert_eq!([rank(&g, &l, "4"), rank(&g, &l, "2"), rank(&g, &l, "1")], [0, 1, 2]);

		// Two mutual pairs under one root, both listed ahead of it.
		let g = graph(
			&["b", "c", "x", "y", "r"],
			&[("b", "c"), ("c", "b"), ("x", "y"), ("y", "x"), ("r", "c"), ("r", "y")],
		);
		let l = run(&g);
		assert_eq!(rank(&g, &l, "r"), 0);
		for id in ["b", "c", "x", "y"] {
			assert!(rank(&g, &l, id) > 0, "{id} is reachable from r");
		}
		assert!(rank(&g, &l, "c") < rank(&g, &l, "b"));
		assert!(rank(&g, &l, "y") < rank(&g, &l, "x"));
	}

	#[test]
	fn self_loops_do_not_affect_rank() {
		let g = graph(&["5"], &[("5", "5")]);
		let l = run(&g);
		assert_eq!(l.rank_count, 1);
		assert_eq!(l.placements[0].center, Point::new(0.0, 0.0));
	}

	#[test]
	fn rows_are_centred_and_spaced_by_widest_node() {
		let g = graph(&["r", "a", "b"], &[("r", "a"), ("r", "b")]);
		let l = run(&g);
		let column = (40.0 + NODE_GAP) * 1.2;
		assert_eq!(l.rows(), vec![vec![0], vec![1, 2]]);
		assert_eq!(l.placements[1].center.x, -column / 2.0);
		assert_eq!(l.placements[2].center.x, column / 2.0);
	}

	#[test]
	fn children_follow_their_parents_order() {
		// w is discovered before u, but u's parents sit further left.
		let g = graph(
			&["a", "b", "c", "p", "q", "r", "u", "w"],
			&[
				("a", "p"),
				("b", "q"),
				("c", "r"),
				("p", "u"),
				("q", "w"),
				("r", "w"),
				("r", "u"),
			],
		);
		let l = run(&g);
		let rows = l.rows();
		assert_eq!(rows[0], vec![0, 1, 2]);
		assert_eq!(rows[1], vec![3, 4, 5]);
		assert_eq!(rows[2], vec![6, 7]);
	}

	#[test]
	fn undirected_mode_uses_first_discovered_depth() {
		let g = graph(&["a", "b", "c"], &[("b", "a"), ("c", "b")]);
		let options = LayoutOptions {
			directed: false,
			..LayoutOptions::default()
		};
		let l = layout(&g, &[Size::new(10.0, 10.0); 3], &options);
		assert_eq!([l.rank(0), l.rank(1), l.rank(2)], [Some(0), Some(1), Some(2)]);
	}

	#[test]
	fn layout_is_deterministic() {
		let g = graph(
			&["a", "b", "c", "d", "e"],
			&[("a", "b"), ("a", "c"), ("c", "d"), ("d", "a"), ("b", "e")],
		);
		assert_eq!(run(&g), run(&g));
	}

	#[test]
	fn force_relaxation_keeps_ranks() {
		let g = graph(
			&["a", "b", "c", "d"],
			&[("a", "b"), ("a", "c"), ("a", "d"), ("b", "d")],
		);
		let sizes = vec![Size::new(40.0, 30.0); 4];
		let plain = layout(&g, &sizes, &LayoutOptions::default());
		let relaxed = layout(
			&g,
			&sizes,
			&LayoutOptions {
				algorithm: LayoutAlgorithm::ForceRelaxed,
				..LayoutOptions::default()
			},
		);
		for (p, r) in plain.placements.iter().zip(&relaxed.placements) {
			assert_eq!(p.rank, r.rank);
			assert_eq!(p.center.y, r.center.y);
			assert!(r.center.x.is_finite());
		}
	}
}
