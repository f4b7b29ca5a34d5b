use cgra_common::db::graph::{Node, RoutingGraph};
use cgra_common::db::indices::{NetId, NodeId};
use cgra_common::util::config::RoutingConfig;

/// Cost of entering a node during path search.
pub trait CostFunction {
    fn node_cost(&self, graph: &RoutingGraph, node: NodeId) -> f64;
}

/// Per-iteration congestion cost: base + present + history + timing.
#[derive(Clone, Debug)]
pub struct CostModel {
    present_factor: f64,
    history_weight: f64,
}

impl CostModel {
    pub fn for_iteration(config: &RoutingConfig, iteration: usize) -> Self {
        Self {
            present_factor: config.present_factor
                * config.present_multiplier.powi(iteration as i32),
            history_weight: config.history_weight,
        }
    }

    pub fn present_factor(&self) -> f64 {
        self.present_factor
    }

    /// Penalty for adding `net` to `node`. The net's own occupancy does not
    /// count against it.
    pub fn present_penalty(&self, node: &Node, net: NetId) -> f64 {
        let others = node.occupancy() - node.is_occupied_by(net) as u32;
        let over = (others + 1).saturating_sub(node.capacity);
        // An unbounded factor times zero would be NaN.
        if over == 0 {
            return 0.0;
        }
        over as f64 * self.present_factor
    }

    pub fn node_cost(&self, node: &Node, net: NetId, slack_weight: f64) -> f64 {
        node.base_cost
            + self.present_penalty(node, net)
            + self.history_weight * node.history()
            + slack_weight * node.delay
    }

    pub fn for_connection(&self, net: NetId, slack_weight: f64) -> ConnectionCost<'_> {
        ConnectionCost {
            model: self,
            net,
            slack_weight,
        }
    }
}

/// The cost model bound to one (source, sink) connection.
pub struct ConnectionCost<'a> {
    model: &'a CostModel,
    net: NetId,
    slack_weight: f64,
}

impl CostFunction for ConnectionCost<'_> {
    #[inline]
    fn node_cost(&self, graph: &RoutingGraph, node: NodeId) -> f64 {
        self.model
            .node_cost(graph.node(node), self.net, self.slack_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgra_common::db::graph::NodeKind;
    use cgra_common::geom::coord::TileCoord;

    fn config() -> RoutingConfig {
        RoutingConfig {
            present_factor: 2.0,
            present_multiplier: 3.0,
            history_weight: 1.0,
            ..RoutingConfig::default()
        }
    }

    fn graph() -> (RoutingGraph, NodeId) {
        let mut g = RoutingGraph::new();
        let n = g.add_node(TileCoord::new(0, 0), "t0", NodeKind::Track, 4.0, 1);
        (g, n)
    }

    #[test]
    fn free_node_costs_base_plus_delay() {
        let (g, n) = graph();
        let model = CostModel::for_iteration(&config(), 0);
        let cost = model.for_connection(NetId::new(0), 0.5);
        assert_eq!(cost.node_cost(&g, n), 1.0 + 0.5 * 4.0);
    }

    #[test]
    fn present_penalty_tracks_oversubscription() {
        let (mut g, n) = graph();
        let model = CostModel::for_iteration(&config(), 0);
        let me = NetId::new(9);

        assert_eq!(model.present_penalty(g.node(n), me), 0.0);
        g.occupy(n, NetId::new(0));
        assert_eq!(model.present_penalty(g.node(n), me), 2.0);
        g.occupy(n, NetId::new(1));
        assert_eq!(model.present_penalty(g.node(n), me), 4.0);
    }

    #[test]
    fn own_occupancy_is_free() {
        let (mut g, n) = graph();
        let model = CostModel::for_iteration(&config(), 0);
        let me = NetId::new(3);
        g.occupy(n, me);
        assert_eq!(model.present_penalty(g.node(n), me), 0.0);
        g.occupy(n, NetId::new(4));
        assert_eq!(model.present_penalty(g.node(n), me), 2.0);
    }

    #[test]
    fn present_factor_grows_per_iteration() {
        let cfg = config();
        assert_eq!(CostModel::for_iteration(&cfg, 0).present_factor(), 2.0);
        assert_eq!(CostModel::for_iteration(&cfg, 2).present_factor(), 18.0);
    }

    #[test]
    fn free_node_stays_free_once_factor_is_unbounded() {
        let (g, n) = graph();
        let model = CostModel::for_iteration(&config(), 5000);
        assert!(model.present_factor().is_infinite());
        assert_eq!(model.present_penalty(g.node(n), NetId::new(0)), 0.0);
    }

    #[test]
    fn history_raises_cost() {
        let (mut g, n) = graph();
        let model = CostModel::for_iteration(&config(), 0);
        let before = model.for_connection(NetId::new(0), 0.0).node_cost(&g, n);
        g.occupy(n, NetId::new(1));
        g.occupy(n, NetId::new(2));
        g.update_history(1.5);
        g.reset_occupancy();
        let after = model.for_connection(NetId::new(0), 0.0).node_cost(&g, n);
        assert_eq!(after - before, 1.5);
    }
}
