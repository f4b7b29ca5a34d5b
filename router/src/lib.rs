pub mod algo;
pub mod cost;
pub mod error;
pub mod global_router;
pub mod net_router;
pub mod slack;

pub use error::RouteError;
pub use global_router::RoutingReport;

use cgra_common::db::core::RoutingDB;
use cgra_common::util::config::RoutingConfig;

/// Routes every registered net of `db`. On success the route table in `db`
/// is conflict-free; on failure it is left as diagnostics only.
pub fn route(db: &mut RoutingDB, config: &RoutingConfig) -> Result<RoutingReport, RouteError> {
    global_router::run(db, config)
}
