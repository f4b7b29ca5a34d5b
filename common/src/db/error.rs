use thiserror::Error;

/// Inconsistent inputs caught while ingesting placement and nets.
#[derive(Debug, Error, PartialEq)]
pub enum DbError {
    #[error("block '{block}' is already placed")]
    DuplicateBinding { block: String },
    #[error("net '{net}' is already registered")]
    DuplicateNet { net: String },
    #[error("net '{net}' has no sinks")]
    NoSinks { net: String },
    #[error("net '{net}': block '{block}' has no placement")]
    UnplacedBlock { net: String, block: String },
}
