//! Dynamics on the lattice: swap moves, chemistry and the parallel schedule.
//!
//! Components:
//! - Energy: asymmetric contact rule and far-side footprints
//! - Legality: chain-topology rules for a single exchange
//! - SwapEngine: legality + sticky boundary + Metropolis acceptance
//! - ReactionEngine: tau-leaped decay, switching, production and transfer
//! - SwapScheduler: 25-color rounds over disjoint row bands with rayon

pub mod energy;
pub mod legality;
pub mod rates;
pub mod reactions;
pub mod schedule;
pub mod swap;

pub use energy::{acceptance_probability, delta_energy, requires_energy_cost, FarSide};
pub use legality::is_swap_allowed_by_chains;
pub use rates::{Rate, RateConstants};
pub use reactions::{ReactionCounts, ReactionEngine};
pub use schedule::{color_of, sites_of_color, ColorPool, SwapScheduler, COLOR_COUNT};
pub use swap::{SwapEngine, SwapOutcome, DEFAULT_OMEGA};
