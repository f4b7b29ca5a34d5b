use crate::algo::Dijkstra;
use crate::cost::CostModel;
use crate::error::RouteError;
use crate::slack::SlackTable;
use cgra_common::db::core::{EndpointKind, RoutingDB, SinkRoute};
use cgra_common::db::indices::NetId;

/// Re-routes every sink of one net against the current occupancy.
///
/// The net's previous occupancy is released first and the union of its
/// recorded paths is committed again at the end, so sinks that fail keep
/// their old path and keep pressing on the nodes it uses. Returns the number
/// of register sinks that could not be pinned this iteration.
///
/// A net driven by a register starts wherever that register is pinned at the
/// time the net is routed. The bypass point itself is held by the feeding
/// net, so it is not occupied a second time here.
pub fn route_net(
    db: &mut RoutingDB,
    net_id: NetId,
    iteration: usize,
    cost: &CostModel,
    slack: &SlackTable,
    solver: &mut Dijkstra,
) -> Result<usize, RouteError> {
    if db.rebind_register_source(net_id) {
        let net = db.net(net_id);
        log::debug!(
            "Iter {}: net '{}' now driven from {}",
            iteration,
            net.name,
            net.source.node.map_or_else(|| "?".to_string(), |n| db.graph.describe(n))
        );
    }

    let RoutingDB {
        graph, nets, routes, ..
    } = db;
    let net = &mut nets[net_id.index()];
    let route = &mut routes[net_id.index()];

    if net.sinks.is_empty() {
        return Err(RouteError::NoSinks {
            net: net.name.clone(),
        });
    }
    let src = net.source.node.ok_or_else(|| RouteError::UnresolvedSource {
        net: net.name.clone(),
        endpoint: net.source.label(),
    })?;

    for node in route.nodes() {
        graph.release(node, net_id);
    }

    let mut failures = 0;
    for (i, sink) in net.sinks.iter_mut().enumerate() {
        let weight = slack.weight(src, sink.node);
        let connection = cost.for_connection(net_id, weight);

        match sink.kind {
            EndpointKind::Register => {
                // Any bypass point on the register's tile will do; the one
                // reached first becomes its location for this iteration.
                let targets = graph.registers_at(sink.pos);
                match solver.find_path(graph, src, targets, &connection) {
                    Some(path) => {
                        let end = path[path.len() - 1];
                        sink.node = Some(end);
                        route.sinks[i] = Some(SinkRoute { sink: end, path });
                    }
                    None => {
                        log::debug!(
                            "Iter {}: net '{}' could not pin register {} at {}",
                            iteration,
                            net.name,
                            sink.block,
                            sink.pos
                        );
                        sink.node = None;
                        failures += 1;
                    }
                }
            }
            EndpointKind::Pin => {
                let target = sink.node.ok_or_else(|| RouteError::UnresolvedSink {
                    net: net.name.clone(),
                    endpoint: sink.label(),
                })?;
                let path = solver
                    .find_path(graph, src, &[target], &connection)
                    .ok_or_else(|| RouteError::Unreachable {
                        net: net.name.clone(),
                        endpoint: sink.label(),
                    })?;
                route.sinks[i] = Some(SinkRoute { sink: target, path });
            }
        }
    }

    let held_by_feeder = net.source.is_register().then_some(src);
    for node in route.nodes().filter(|&n| Some(n) != held_by_feeder) {
        graph.occupy(node, net_id);
    }
    Ok(failures)
}
