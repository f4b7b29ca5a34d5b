//! Per-connection timing criticality.
//!
//! Ratios are computed per (source, sink) pin pair from the delay of the
//! path realized in the previous iteration, normalized so the slowest
//! connection gets 1.0.

use crate::error::RouteError;
use cgra_common::db::core::{Net, RoutingDB};
use cgra_common::db::indices::NodeId;
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SlackTable {
    ratios: HashMap<(NodeId, NodeId), f64>,
}

impl SlackTable {
    pub fn compute(db: &RoutingDB, iteration: usize) -> Result<Self, RouteError> {
        if iteration == 0 {
            return Ok(Self::fully_critical(db));
        }

        let per_net: Vec<Result<Vec<((NodeId, NodeId), f64)>, RouteError>> = db
            .nets
            .par_iter()
            .map(|net| realized_delays(db, net))
            .collect();

        let mut ratios = HashMap::new();
        let mut max_delay = 0.0f64;
        for delays in per_net {
            for (pair, delay) in delays? {
                max_delay = max_delay.max(delay);
                // Nets sharing a pin pair are judged by the slowest of them.
                ratios
                    .entry(pair)
                    .and_modify(|d: &mut f64| *d = d.max(delay))
                    .or_insert(delay);
            }
        }

        for ratio in ratios.values_mut() {
            *ratio = if max_delay > 0.0 {
                *ratio / max_delay
            } else {
                1.0
            };
        }
        Ok(Self { ratios })
    }

    // No delay is known before the first iteration.
    fn fully_critical(db: &RoutingDB) -> Self {
        let mut ratios = HashMap::new();
        for net in &db.nets {
            let Some(src) = net.source.node else {
                continue;
            };
            for sink in net.sinks.iter().filter_map(|s| s.node) {
                ratios.insert((src, sink), 1.0);
            }
        }
        Self { ratios }
    }

    /// Connections without a realized delay are treated as fully critical.
    pub fn weight(&self, source: NodeId, sink: Option<NodeId>) -> f64 {
        sink.and_then(|s| self.ratios.get(&(source, s)).copied())
            .unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    pub fn max_ratio(&self) -> Option<f64> {
        self.ratios.values().copied().reduce(f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(NodeId, NodeId), &f64)> {
        self.ratios.iter()
    }
}

fn realized_delays(
    db: &RoutingDB,
    net: &Net,
) -> Result<Vec<((NodeId, NodeId), f64)>, RouteError> {
    let src = net.source.node.ok_or_else(|| RouteError::UnresolvedSource {
        net: net.name.clone(),
        endpoint: net.source.label(),
    })?;
    let route = db.route_of(net.id);

    let mut delays = Vec::with_capacity(net.sinks.len());
    for (i, sink) in net.sinks.iter().enumerate() {
        // A register sink that could not be pinned has nothing to measure.
        let Some(sink_node) = sink.node else {
            if sink.is_register() {
                continue;
            }
            return Err(RouteError::MissingDelay {
                net: net.name.clone(),
                endpoint: sink.label(),
            });
        };
        let path = route
            .sinks
            .get(i)
            .and_then(Option::as_ref)
            .filter(|r| r.sink == sink_node)
            .map(|r| &r.path)
            .ok_or_else(|| RouteError::MissingDelay {
                net: net.name.clone(),
                endpoint: sink.label(),
            })?;
        delays.push(((src, sink_node), db.graph.path_delay(path)));
    }
    Ok(delays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgra_common::db::core::{NetDescription, PinRef, SinkRoute};
    use cgra_common::db::graph::{NodeKind, RoutingGraph};
    use cgra_common::geom::coord::TileCoord;

    // p0:out fans out to p1:in0 over one track and to p2:in0 over two.
    fn fanout_db() -> (RoutingDB, Vec<NodeId>) {
        let mut g = RoutingGraph::new();
        let out = g.add_node(TileCoord::new(0, 0), "out", NodeKind::Port, 0.0, 1);
        let t0 = g.add_node(TileCoord::new(0, 0), "t0", NodeKind::Track, 2.0, 1);
        let t1 = g.add_node(TileCoord::new(1, 0), "t0", NodeKind::Track, 2.0, 1);
        let in1 = g.add_node(TileCoord::new(1, 0), "in0", NodeKind::Port, 0.0, 1);
        let in2 = g.add_node(TileCoord::new(2, 0), "in0", NodeKind::Port, 0.0, 1);
        g.add_edge(out, t0, 0.0);
        g.add_edge(t0, in1, 0.0);
        g.add_edge(t0, t1, 0.0);
        g.add_edge(t1, in2, 0.0);
        let mut db = RoutingDB::new(g);
        db.bind_block(0, 0, "p0").unwrap();
        db.bind_block(1, 0, "p1").unwrap();
        db.bind_block(2, 0, "p2").unwrap();
        db.bind_block(2, 0, "r0").unwrap();
        db.register_net(&NetDescription {
            name: "n0".to_string(),
            width: 16,
            pins: vec![
                PinRef::new("p0", "out"),
                PinRef::new("p1", "in0"),
                PinRef::new("p2", "in0"),
            ],
        })
        .unwrap();
        (db, vec![out, t0, t1, in1, in2])
    }

    fn record_routes(db: &mut RoutingDB, n: &[NodeId]) {
        db.routes[0].sinks[0] = Some(SinkRoute {
            sink: n[3],
            path: vec![n[0], n[1], n[3]],
        });
        db.routes[0].sinks[1] = Some(SinkRoute {
            sink: n[4],
            path: vec![n[0], n[1], n[2], n[4]],
        });
    }

    #[test]
    fn first_iteration_is_fully_critical() {
        let (db, n) = fanout_db();
        let table = SlackTable::compute(&db, 0).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|(_, &r)| r == 1.0));
        assert_eq!(table.weight(n[0], Some(n[3])), 1.0);
    }

    #[test]
    fn ratios_are_normalized_to_slowest_connection() {
        let (mut db, n) = fanout_db();
        record_routes(&mut db, &n);
        let table = SlackTable::compute(&db, 1).unwrap();
        assert_eq!(table.max_ratio(), Some(1.0));
        assert_eq!(table.weight(n[0], Some(n[4])), 1.0);
        assert_eq!(table.weight(n[0], Some(n[3])), 0.5);
        assert!(table.iter().all(|(_, &r)| (0.0..=1.0).contains(&r)));
    }

    #[test]
    fn missing_route_is_an_internal_error() {
        let (mut db, n) = fanout_db();
        record_routes(&mut db, &n);
        db.routes[0].sinks[1] = None;
        let err = SlackTable::compute(&db, 1).unwrap_err();
        assert!(matches!(err, RouteError::MissingDelay { .. }));
    }

    #[test]
    fn zero_delay_paths_stay_critical() {
        let (mut db, n) = fanout_db();
        db.routes[0].sinks[0] = Some(SinkRoute {
            sink: n[3],
            path: vec![n[0], n[3]],
        });
        db.routes[0].sinks[1] = Some(SinkRoute {
            sink: n[4],
            path: vec![n[0], n[4]],
        });
        let table = SlackTable::compute(&db, 3).unwrap();
        assert_eq!(table.max_ratio(), Some(1.0));
    }

    #[test]
    fn shared_pin_pair_keeps_slowest_net() {
        let (mut db, n) = fanout_db();
        db.register_net(&NetDescription {
            name: "n1".to_string(),
            width: 16,
            pins: vec![PinRef::new("p0", "out"), PinRef::new("p1", "in0")],
        })
        .unwrap();
        db.routes[0].sinks[0] = Some(SinkRoute {
            sink: n[3],
            path: vec![n[0], n[1], n[2], n[3]],
        });
        db.routes[0].sinks[1] = Some(SinkRoute {
            sink: n[4],
            path: vec![n[0], n[1], n[2], n[4]],
        });
        db.routes[1].sinks[0] = Some(SinkRoute {
            sink: n[3],
            path: vec![n[0], n[1], n[3]],
        });

        let table = SlackTable::compute(&db, 1).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.weight(n[0], Some(n[3])), 1.0);
    }

    #[test]
    fn unpinned_register_sink_is_skipped() {
        let (mut db, n) = fanout_db();
        db.register_net(&NetDescription {
            name: "n1".to_string(),
            width: 16,
            pins: vec![PinRef::new("p1", "in0"), PinRef::new("r0", "reg")],
        })
        .unwrap();
        record_routes(&mut db, &n);
        let table = SlackTable::compute(&db, 1).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.weight(n[3], None), 1.0);
    }
}
