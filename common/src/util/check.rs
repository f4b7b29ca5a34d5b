use crate::db::core::RoutingDB;
use crate::db::indices::NodeId;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Verifies the realized routes of `db` independently of the router state:
/// connectivity of every sink path and capacity of every node. A register
/// must drive from the bypass point it is fed at.
pub fn run(db: &RoutingDB) -> Result<(), String> {
    log::info!("Starting Route Verification...");

    let (paths_result, (capacity_result, register_result)) = rayon::join(
        || check_paths(db),
        || rayon::join(|| check_capacity(db), || check_registers(db)),
    );

    let mut msgs = Vec::new();
    for (result, fail, pass) in [
        (
            paths_result,
            "Broken or Missing Route",
            "Every sink is connected to its source.",
        ),
        (
            capacity_result,
            "Routing Resource Overflow",
            "No resource exceeds its capacity.",
        ),
        (
            register_result,
            "Register Placed Twice",
            "Every register drives from where it is fed.",
        ),
    ] {
        match result {
            Err(e) => {
                log::error!("\x1b[31mFAIL\x1b[0m: {}", fail);
                log::error!("{}", e);
                msgs.push(e);
            }
            Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: {}", pass),
        }
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mSUCCESS\x1b[0m: VALID ROUTING");
        Ok(())
    } else {
        log::error!(
            "\x1b[31mFAILURE\x1b[0m: INVALID ROUTING ({} Errors)",
            msgs.len()
        );
        Err(msgs.join("; "))
    }
}

fn check_paths(db: &RoutingDB) -> Result<(), String> {
    let error_found = AtomicBool::new(false);
    let error_msg = Arc::new(Mutex::new(String::new()));

    let report = |msg: String| {
        if !error_found.swap(true, Ordering::Relaxed) {
            *error_msg.lock().unwrap() = msg;
        }
    };

    db.nets.par_iter().for_each(|net| {
        if error_found.load(Ordering::Relaxed) {
            return;
        }
        let Some(src) = net.source.node else {
            report(format!("Net '{}': Source is not bound.", net.name));
            return;
        };
        let route = db.route_of(net.id);

        for (i, sink) in net.sinks.iter().enumerate() {
            let Some(sink_route) = route.sinks.get(i).and_then(Option::as_ref) else {
                report(format!("Net '{}': Sink {} is unrouted.", net.name, sink.label()));
                return;
            };
            if sink.node != Some(sink_route.sink) {
                report(format!(
                    "Net '{}': Sink {} is bound to a different node than its route.",
                    net.name,
                    sink.label()
                ));
                return;
            }
            let path = &sink_route.path;
            if path.first() != Some(&src) || path.last() != Some(&sink_route.sink) {
                report(format!(
                    "Net '{}': Route to {} does not span source to sink.",
                    net.name,
                    sink.label()
                ));
                return;
            }
            if let Some(w) = path.windows(2).find(|w| !db.graph.has_edge(w[0], w[1])) {
                report(format!(
                    "Net '{}': Route to {} jumps from {} to {} without an edge.",
                    net.name,
                    sink.label(),
                    db.graph.describe(w[0]),
                    db.graph.describe(w[1])
                ));
                return;
            }
        }
    });

    if error_found.load(Ordering::Relaxed) {
        Err(error_msg.lock().unwrap().clone())
    } else {
        Ok(())
    }
}

fn check_capacity(db: &RoutingDB) -> Result<(), String> {
    // Rebuilt from the route table so stale occupancy in the graph is caught too.
    // A register-driven net starts on a bypass point its feeding net holds.
    let mut users: HashMap<NodeId, usize> = HashMap::new();
    for (net, route) in db.nets.iter().zip(db.routes()) {
        let held_by_feeder = net.source.node.filter(|_| net.source.is_register());
        let mut nodes: Vec<NodeId> = route
            .nodes()
            .filter(|&n| Some(n) != held_by_feeder)
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        for node in nodes {
            *users.entry(node).or_insert(0) += 1;
        }
    }

    let mut overflowed: Vec<(NodeId, usize)> = users
        .into_par_iter()
        .filter(|&(id, count)| count > db.graph.node(id).capacity as usize)
        .collect();

    if overflowed.is_empty() {
        return Ok(());
    }
    overflowed.sort_unstable();
    let (worst, count) = overflowed
        .iter()
        .copied()
        .max_by_key(|&(_, count)| count)
        .unwrap_or(overflowed[0]);
    Err(format!(
        "{} nodes over capacity, worst {} used by {} nets (capacity {})",
        overflowed.len(),
        db.graph.describe(worst),
        count,
        db.graph.node(worst).capacity
    ))
}

fn check_registers(db: &RoutingDB) -> Result<(), String> {
    let split: Vec<String> = db
        .nets
        .par_iter()
        .filter(|net| net.source.is_register())
        .filter_map(|net| {
            let pinned = db.register_location(&net.source.block)?;
            if net.source.node == Some(pinned) {
                return None;
            }
            Some(format!(
                "Register {} is fed at {} but drives net '{}' from {}",
                net.source.block,
                db.graph.describe(pinned),
                net.name,
                net.source
                    .node
                    .map_or_else(|| "nowhere".to_string(), |n| db.graph.describe(n))
            ))
        })
        .collect();

    match split.first() {
        None => Ok(()),
        Some(first) => Err(format!("{} registers split, e.g. {}", split.len(), first)),
    }
}
