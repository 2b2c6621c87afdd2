//! Error taxonomy for lattice setup.
//!
//! Only initialization can fail. Swap and reaction operations either act or
//! are no-ops, so they never surface an error.

use thiserror::Error;

use crate::lattice::ChainId;

/// Errors raised while building or initializing a lattice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LatticeError {
    /// A site would need a third simultaneous chain membership.
    #[error("site ({column}, {row}) already belongs to the maximum number of chains; cannot add chain {chain_id}")]
    ChainCapacity { column: i32, row: i32, chain_id: ChainId },
    /// An initialization step left the interior addressable range.
    #[error("position ({column}, {row}) lies outside the lattice interior")]
    OutsideInterior { column: i32, row: i32 },
    /// Lattice dimensions with zero area (or too large to address).
    #[error("invalid lattice dimensions {columns}x{rows}")]
    InvalidDimensions { columns: i64, rows: i64 },
    /// A chain request that cannot describe a well-formed chain.
    #[error("invalid chain: {0}")]
    InvalidChain(String),
    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, LatticeError>;
