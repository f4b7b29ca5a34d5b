use crate::db::indices::{NetId, NodeId};
use crate::geom::coord::TileCoord;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Port,
    Register,
    Switch,
    Track,
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "port" => Ok(NodeKind::Port),
            "reg" | "register" => Ok(NodeKind::Register),
            "switch" | "sb" => Ok(NodeKind::Switch),
            "track" | "wire" => Ok(NodeKind::Track),
            other => Err(format!("unknown node kind '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub to: NodeId,
    pub cost: f64,
}

/// A single routing resource of the device.
///
/// Occupancy and history are the only fields that change during a routing
/// run; everything else is fixed once the graph is built.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub pos: TileCoord,
    pub delay: f64,
    pub capacity: u32,
    pub base_cost: f64,
    pub edges: Vec<Edge>,
    occupants: BTreeSet<NetId>,
    history: f64,
}

impl Node {
    #[inline]
    pub fn occupancy(&self) -> u32 {
        self.occupants.len() as u32
    }

    #[inline]
    pub fn is_occupied_by(&self, net: NetId) -> bool {
        self.occupants.contains(&net)
    }

    #[inline]
    pub fn history(&self) -> f64 {
        self.history
    }

    #[inline]
    pub fn overflow(&self) -> u32 {
        self.occupancy().saturating_sub(self.capacity)
    }

    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.occupancy() > self.capacity
    }
}

/// Arena of routing nodes addressed by `NodeId`.
#[derive(Debug)]
pub struct RoutingGraph {
    pub nodes: Vec<Node>,
    pub width: u32,
    pub height: u32,
    name_map: HashMap<(TileCoord, String), NodeId>,
    registers: HashMap<TileCoord, Vec<NodeId>>,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(1000),
            width: 0,
            height: 0,
            name_map: HashMap::new(),
            registers: HashMap::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.nodes.iter().map(|n| n.edges.len()).sum()
    }

    /// Adds a node, or returns the existing one with the same tile-local name.
    pub fn add_node(
        &mut self,
        pos: TileCoord,
        name: &str,
        kind: NodeKind,
        delay: f64,
        capacity: u32,
    ) -> NodeId {
        if let Some(&id) = self.name_map.get(&(pos, name.to_string())) {
            return id;
        }
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            pos,
            delay,
            capacity,
            base_cost: 1.0,
            edges: Vec::new(),
            occupants: BTreeSet::new(),
            history: 0.0,
        });
        self.name_map.insert((pos, name.to_string()), id);
        if kind == NodeKind::Register {
            self.registers.entry(pos).or_default().push(id);
        }
        self.width = self.width.max(pos.x + 1);
        self.height = self.height.max(pos.y + 1);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, cost: f64) {
        self.nodes[from.index()].edges.push(Edge { to, cost });
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn set_base_cost(&mut self, id: NodeId, cost: f64) {
        self.nodes[id.index()].base_cost = cost;
    }

    pub fn find(&self, pos: TileCoord, name: &str) -> Option<NodeId> {
        self.name_map.get(&(pos, name.to_string())).copied()
    }

    /// Block pin lookup; only `Port` nodes qualify.
    pub fn find_port(&self, pos: TileCoord, name: &str) -> Option<NodeId> {
        self.find(pos, name)
            .filter(|&id| self.node(id).kind == NodeKind::Port)
    }

    /// Register-bypass points on a tile, in creation order.
    pub fn registers_at(&self, pos: TileCoord) -> &[NodeId] {
        self.registers.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.node(from).edges.iter().any(|e| e.to == to)
    }

    pub fn path_delay(&self, path: &[NodeId]) -> f64 {
        path.iter().map(|&id| self.node(id).delay).sum()
    }

    pub fn occupy(&mut self, id: NodeId, net: NetId) {
        self.nodes[id.index()].occupants.insert(net);
    }

    pub fn release(&mut self, id: NodeId, net: NetId) {
        self.nodes[id.index()].occupants.remove(&net);
    }

    pub fn reset_occupancy(&mut self) {
        for node in &mut self.nodes {
            node.occupants.clear();
        }
    }

    pub fn reset_history(&mut self) {
        for node in &mut self.nodes {
            node.history = 0.0;
        }
    }

    /// Raises the history cost of every overflowed node. Returns how many
    /// nodes were touched.
    pub fn update_history(&mut self, history_increment: f64) -> usize {
        let mut updated = 0;
        for node in &mut self.nodes {
            if node.is_overflowed() {
                node.history += node.overflow() as f64 * history_increment;
                updated += 1;
            }
        }
        updated
    }

    pub fn overflowed_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_overflowed())
            .map(|(i, _)| NodeId::new(i))
            .collect()
    }

    pub fn total_overflow(&self) -> u32 {
        self.nodes.iter().map(Node::overflow).sum()
    }

    pub fn describe(&self, id: NodeId) -> String {
        let n = self.node(id);
        format!("{}@{}", n.name, n.pos)
    }
}

impl Default for RoutingGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph() -> (RoutingGraph, NodeId, NodeId) {
        let mut g = RoutingGraph::new();
        let a = g.add_node(TileCoord::new(0, 0), "a", NodeKind::Track, 1.0, 1);
        let b = g.add_node(TileCoord::new(1, 0), "b", NodeKind::Track, 2.0, 1);
        g.add_edge(a, b, 0.5);
        (g, a, b)
    }

    #[test]
    fn add_node_is_keyed_by_tile_and_name() {
        let (mut g, a, _) = two_node_graph();
        let again = g.add_node(TileCoord::new(0, 0), "a", NodeKind::Track, 1.0, 1);
        assert_eq!(a, again);
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.width, 2);
        assert_eq!(g.height, 1);
    }

    #[test]
    fn find_port_ignores_other_kinds() {
        let mut g = RoutingGraph::new();
        let t = TileCoord::new(2, 3);
        g.add_node(t, "out", NodeKind::Track, 0.0, 1);
        let p = g.add_node(t, "in0", NodeKind::Port, 0.0, 1);
        assert_eq!(g.find_port(t, "in0"), Some(p));
        assert_eq!(g.find_port(t, "out"), None);
    }

    #[test]
    fn registers_are_indexed_per_tile() {
        let mut g = RoutingGraph::new();
        let t = TileCoord::new(1, 1);
        let r0 = g.add_node(t, "reg0", NodeKind::Register, 1.0, 1);
        let r1 = g.add_node(t, "reg1", NodeKind::Register, 1.0, 1);
        assert_eq!(g.registers_at(t), &[r0, r1]);
        assert!(g.registers_at(TileCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn occupancy_counts_distinct_nets() {
        let (mut g, a, _) = two_node_graph();
        g.occupy(a, NetId::new(0));
        g.occupy(a, NetId::new(0));
        assert_eq!(g.node(a).occupancy(), 1);
        assert!(!g.node(a).is_overflowed());

        g.occupy(a, NetId::new(1));
        assert_eq!(g.node(a).occupancy(), 2);
        assert_eq!(g.overflowed_nodes(), vec![a]);

        g.release(a, NetId::new(0));
        assert!(g.overflowed_nodes().is_empty());
    }

    #[test]
    fn history_only_grows_on_overflowed_nodes() {
        let (mut g, a, b) = two_node_graph();
        g.occupy(a, NetId::new(0));
        g.occupy(a, NetId::new(1));
        g.occupy(a, NetId::new(2));
        g.occupy(b, NetId::new(0));

        assert_eq!(g.update_history(0.5), 1);
        assert_eq!(g.node(a).history(), 1.0);
        assert_eq!(g.node(b).history(), 0.0);

        g.update_history(0.5);
        assert_eq!(g.node(a).history(), 2.0);

        g.reset_occupancy();
        assert_eq!(g.update_history(0.5), 0);
        assert_eq!(g.node(a).history(), 2.0);

        g.reset_history();
        assert_eq!(g.node(a).history(), 0.0);
    }

    #[test]
    fn path_delay_sums_nodes() {
        let (g, a, b) = two_node_graph();
        assert_eq!(g.path_delay(&[a, b]), 3.0);
        assert!(g.has_edge(a, b));
        assert!(!g.has_edge(b, a));
    }

    #[test]
    fn node_kind_parses_aliases() {
        assert_eq!("REG".parse::<NodeKind>(), Ok(NodeKind::Register));
        assert_eq!("wire".parse::<NodeKind>(), Ok(NodeKind::Track));
        assert!("lut".parse::<NodeKind>().is_err());
    }
}
