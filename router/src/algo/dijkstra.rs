use crate::cost::CostFunction;
use cgra_common::db::graph::{NodeKind, RoutingGraph};
use cgra_common::db::indices::NodeId;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;

// Costs are searched in fixed point so ordering is total and reproducible.
const SCALE: f64 = 1000.0;

/// Fixed-point step cost. Late iterations can push the present factor far
/// past `i64` range; those steps pin at `i64::MAX` and path sums saturate.
#[inline]
fn to_fixed(step: f64) -> i64 {
    let scaled = (step * SCALE).round();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else if scaled >= i64::MAX as f64 {
        i64::MAX
    } else {
        scaled as i64
    }
}

/// Least-cost path search over the routing graph.
///
/// Scratch buffers are kept between searches and invalidated with a
/// generation tag instead of being cleared.
#[derive(Clone)]
pub struct Dijkstra {
    parents: Vec<u32>,
    g_score: Vec<i64>,
    visited_tag: Vec<u32>,
    target_tag: Vec<u32>,
    current_tag: u32,
}

impl Dijkstra {
    pub fn new() -> Self {
        Self {
            parents: Vec::new(),
            g_score: Vec::new(),
            visited_tag: Vec::new(),
            target_tag: Vec::new(),
            current_tag: 1,
        }
    }

    fn ensure_capacity(&mut self, size: usize) {
        if size > self.parents.len() {
            self.parents.resize(size, u32::MAX);
            self.g_score.resize(size, i64::MAX);
            self.visited_tag.resize(size, 0);
            self.target_tag.resize(size, 0);
        }
    }

    fn reset(&mut self) {
        self.current_tag = self.current_tag.wrapping_add(1);
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.target_tag.fill(0);
            self.current_tag = 1;
        }
    }

    /// Finds the cheapest path from `source` to any node in `targets`.
    ///
    /// Entering a node costs the edge switching cost plus `cost.node_cost`.
    /// Port nodes other than the targets are never entered. Equal-cost
    /// frontier entries are expanded lowest index first.
    pub fn find_path<C: CostFunction>(
        &mut self,
        graph: &RoutingGraph,
        source: NodeId,
        targets: &[NodeId],
        cost: &C,
    ) -> Option<Vec<NodeId>> {
        if targets.is_empty() {
            return None;
        }
        self.ensure_capacity(graph.num_nodes());
        self.reset();
        let tag = self.current_tag;

        for t in targets {
            self.target_tag[t.index()] = tag;
        }

        let mut frontier: PriorityQueue<u32, Reverse<(i64, u32)>> = PriorityQueue::new();
        let src = source.index();
        self.g_score[src] = 0;
        self.parents[src] = u32::MAX;
        self.visited_tag[src] = tag;
        frontier.push(source.0, Reverse((0, source.0)));

        while let Some((index, Reverse((current_g, _)))) = frontier.pop() {
            let current = NodeId(index);
            if self.target_tag[current.index()] == tag {
                return Some(self.reconstruct_path(current));
            }

            for edge in &graph.node(current).edges {
                let next = edge.to;
                let is_target = self.target_tag[next.index()] == tag;
                if graph.node(next).kind == NodeKind::Port && !is_target {
                    continue;
                }

                let step = edge.cost + cost.node_cost(graph, next);
                let tentative_g = current_g.saturating_add(to_fixed(step));
                let ni = next.index();

                if self.visited_tag[ni] != tag || tentative_g < self.g_score[ni] {
                    self.parents[ni] = index;
                    self.g_score[ni] = tentative_g;
                    self.visited_tag[ni] = tag;
                    frontier.push(next.0, Reverse((tentative_g, next.0)));
                }
            }
        }
        None
    }

    fn reconstruct_path(&self, end: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut curr = end.0;
        loop {
            path.push(NodeId(curr));
            let parent = self.parents[curr as usize];
            if parent == u32::MAX {
                break;
            }
            curr = parent;
        }
        path.reverse();
        path
    }
}

impl Default for Dijkstra {
    fn default() -> Self {
        Self::new()
    }
}
