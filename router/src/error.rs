use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("net '{net}': source {endpoint} is not bound to a routing node")]
    UnresolvedSource { net: String, endpoint: String },

    #[error("net '{net}': block pin {endpoint} has no routing node")]
    UnresolvedSink { net: String, endpoint: String },

    #[error("net '{net}' has no sinks")]
    NoSinks { net: String },

    #[error("net '{net}': no path from source to {endpoint}")]
    Unreachable { net: String, endpoint: String },

    #[error("net '{net}': no realized delay for sink {endpoint} when computing slack ratio")]
    MissingDelay { net: String, endpoint: String },

    #[error(
        "unable to route after {iterations} iterations: {overflowed} overflowed nodes, \
         {failed_sinks} unresolved register sinks{}",
        .worst.as_ref().map(|w| format!(", worst at {}", w)).unwrap_or_default()
    )]
    Congestion {
        iterations: usize,
        overflowed: usize,
        failed_sinks: usize,
        worst: Option<String>,
    },
}

impl RouteError {
    /// Only congestion can be cured by a larger budget or another device;
    /// every other variant points at inconsistent inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::Congestion { .. })
    }
}
