//! Lattice Monte-Carlo simulation of chromatin and RNA-binding proteins.
//!
//! Two coupled engines act on a haloed 2D lattice:
//! - chain-constrained, energy-biased exchange moves, run in parallel over a
//!   25-color partition of the lattice ([`engine::SwapScheduler`])
//! - tau-leaped per-site chemistry: activity and transcribability
//!   switching, RNA production, decay and transfer ([`engine::ReactionEngine`])
//!
//! [`Microemulsion`] bundles both with the worker pool and random streams.
//! Enable the `python` feature for PyO3 bindings.

pub mod engine;
pub mod error;
pub mod lattice;
mod microemulsion;

#[cfg(feature = "python")]
mod python;

pub use engine::{Rate, RateConstants, ReactionCounts, ReactionEngine, SwapEngine, SwapOutcome, SwapScheduler};
pub use error::{LatticeError, Result};
pub use lattice::{
    ChainId, ChainMembership, ChemicalState, Displacement, Flags, Lattice, LatticeInitializer, Position, Site,
    SiteGrid, Species,
};
pub use microemulsion::{Microemulsion, MicroemulsionConfig};
