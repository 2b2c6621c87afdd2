//! Lattice state: site records, the haloed grid, chain queries and setup.

mod chains;
mod grid;
mod init;
mod site;
mod snapshot;

pub use chains::{ChainIndex, ChainLayout};
pub use grid::{Lattice, LatticeBand, Position, SiteGrid, BAND_HALF_HEIGHT, FIRST_INDEX};
pub use init::{Displacement, LatticeInitializer};
pub use site::{
    Activity, ChainId, ChainMembership, ChemicalState, Flags, Site, Species, MAX_CROSSING_CHAINS,
};
pub use snapshot::{
    LEVEL_ACTIVE_CHROMATIN, LEVEL_ACTIVE_RBP, LEVEL_INACTIVE_CHROMATIN, LEVEL_INACTIVE_RBP,
};
