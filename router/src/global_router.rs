//! Negotiated-congestion (PathFinder) routing loop.
//!
//! Every iteration re-routes all nets in a fixed order against a cost that
//! charges for present overuse and for history. Resources that stay
//! overused get more expensive each iteration until nets spread out.

use crate::algo::Dijkstra;
use crate::cost::CostModel;
use crate::error::RouteError;
use crate::net_router;
use crate::slack::SlackTable;
use cgra_common::db::core::RoutingDB;
use cgra_common::db::indices::NetId;
use cgra_common::util::config::RoutingConfig;
use cgra_common::util::profiler::ScopedTimer;

#[derive(Clone, Debug, PartialEq)]
pub struct RoutingReport {
    pub iterations: usize,
    pub wirelength: usize,
    pub critical_delay: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationOutcome {
    pub iteration: usize,
    pub overflowed: usize,
    pub failed_sinks: usize,
}

impl IterationOutcome {
    pub fn converged(&self) -> bool {
        self.overflowed == 0 && self.failed_sinks == 0
    }
}

pub struct GlobalRouter<'a> {
    config: &'a RoutingConfig,
    order: Vec<NetId>,
    solver: Dijkstra,
    iteration: usize,
}

impl<'a> GlobalRouter<'a> {
    /// Starts a fresh run: history, occupancy and previous routes are wiped.
    pub fn new(db: &mut RoutingDB, config: &'a RoutingConfig) -> Self {
        db.graph.reset_history();
        db.reset_routes();
        Self {
            config,
            order: net_order(db),
            solver: Dijkstra::new(),
            iteration: 0,
        }
    }

    pub fn order(&self) -> &[NetId] {
        &self.order
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Routes every net once. History is raised afterwards unless the
    /// iteration converged.
    pub fn run_iteration(&mut self, db: &mut RoutingDB) -> Result<IterationOutcome, RouteError> {
        let it = self.iteration;
        let timer = ScopedTimer::quiet("Routing iteration");

        let slack = SlackTable::compute(db, it)?;
        let cost = CostModel::for_iteration(self.config, it);

        let mut failed_sinks = 0;
        for &net_id in &self.order {
            failed_sinks += net_router::route_net(db, net_id, it, &cost, &slack, &mut self.solver)?;
        }

        let outcome = IterationOutcome {
            iteration: it,
            overflowed: db.overflowed_nodes().len(),
            failed_sinks,
        };

        log::info!(
            "Iter {}: Overflowed: {} (excess {}), Failed Sinks: {}, Penalty: {:.2}, Time: {}ms",
            it,
            outcome.overflowed,
            db.graph.total_overflow(),
            outcome.failed_sinks,
            cost.present_factor(),
            timer.elapsed().as_millis()
        );

        if !outcome.converged() {
            let updated = db.graph.update_history(self.config.history_increment);
            log::debug!("Iter {}: raised history on {} nodes", it, updated);
        }

        self.iteration += 1;
        Ok(outcome)
    }

    pub fn run(mut self, db: &mut RoutingDB) -> Result<RoutingReport, RouteError> {
        let mut last = None;
        while self.iteration < self.config.max_iterations {
            let outcome = self.run_iteration(db)?;
            if outcome.converged() {
                log::info!("Routing Converged at iter {}!", outcome.iteration);
                return Ok(report(db, self.iteration));
            }
            last = Some(outcome);
        }

        let worst = db
            .overflowed_nodes()
            .into_iter()
            .max_by_key(|&id| (db.graph.node(id).overflow(), std::cmp::Reverse(id)))
            .map(|id| db.graph.describe(id));
        let err = RouteError::Congestion {
            iterations: self.iteration,
            overflowed: last.map_or(0, |o| o.overflowed),
            failed_sinks: last.map_or(0, |o| o.failed_sinks),
            worst,
        };
        log::warn!("{}", err);
        Err(err)
    }
}

/// Nets with a register sink go first so the bypass points they pin are
/// already committed when the remaining nets are costed. Both groups keep
/// insertion order.
pub fn net_order(db: &RoutingDB) -> Vec<NetId> {
    let (registered, pure): (Vec<NetId>, Vec<NetId>) = db
        .nets
        .iter()
        .map(|n| n.id)
        .partition(|&id| db.net(id).has_register_sink());
    registered.into_iter().chain(pure).collect()
}

pub fn run(db: &mut RoutingDB, config: &RoutingConfig) -> Result<RoutingReport, RouteError> {
    let _timer = ScopedTimer::new("Global Routing");
    log::info!(
        "Starting Negotiated-Congestion Routing: {} nets, {} nodes, budget {} iterations",
        db.num_nets(),
        db.graph.num_nodes(),
        config.max_iterations
    );
    GlobalRouter::new(db, config).run(db)
}

fn report(db: &RoutingDB, iterations: usize) -> RoutingReport {
    let critical_delay = db
        .routes()
        .iter()
        .flat_map(|r| r.sinks.iter().flatten())
        .map(|s| db.graph.path_delay(&s.path))
        .fold(0.0, f64::max);
    RoutingReport {
        iterations,
        wirelength: db.total_wirelength(),
        critical_delay,
    }
}
