//! Chain-constrained, energy-biased exchange moves.

use rand::Rng;

use super::energy::{acceptance_probability, delta_energy, MAX_CONTACTS_CHANGED};
use super::legality::is_swap_allowed_by_chains;
use crate::lattice::{Position, SiteGrid};

/// Default contact energy.
pub const DEFAULT_OMEGA: f64 = 0.25;

/// Outcome of one swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Accepted,
    /// Would break a chain, or the two sites are indistinguishable.
    RejectedByChains,
    /// Inactive chromatin held at the lattice edge.
    RejectedByBoundary,
    /// Lost the Metropolis draw.
    RejectedByEnergy,
}

impl SwapOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SwapOutcome::Accepted)
    }
}

/// Swap Legality & Energy Engine.
///
/// Stateless apart from its parameters; all randomness comes from the
/// caller's generator so that each worker can drive it with its own stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapEngine {
    omega: f64,
    delta_e_min: f64,
    sticky_boundary: bool,
}

impl Default for SwapEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OMEGA, false)
    }
}

impl SwapEngine {
    pub fn new(omega: f64, sticky_boundary: bool) -> Self {
        Self {
            omega,
            delta_e_min: -MAX_CONTACTS_CHANGED * omega.abs(),
            sticky_boundary,
        }
    }

    #[inline]
    pub fn omega(&self) -> f64 {
        self.omega
    }

    #[inline]
    pub fn delta_e_min(&self) -> f64 {
        self.delta_e_min
    }

    #[inline]
    pub fn sticky_boundary(&self) -> bool {
        self.sticky_boundary
    }

    pub fn set_omega(&mut self, omega: f64) {
        tracing::info!(previous = self.omega, omega, "swap.set_omega");
        *self = Self::new(omega, self.sticky_boundary);
    }

    pub fn set_sticky_boundary(&mut self, sticky_boundary: bool) {
        tracing::info!(sticky_boundary, "swap.set_sticky_boundary");
        self.sticky_boundary = sticky_boundary;
    }

    /// Try to exchange `(column, row)` with a uniformly drawn neighbor.
    ///
    /// Returns true if the lattice changed.
    pub fn attempt_swap<G, R>(&self, grid: &mut G, column: i32, row: i32, rng: &mut R) -> bool
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        let neighbor = grid.random_neighbor_of(column, row, rng);
        self.attempt_swap_with(grid, (column, row), neighbor, rng)
            .is_accepted()
    }

    /// Evaluate and possibly perform the exchange of `a` with its neighbor `b`.
    pub fn attempt_swap_with<G, R>(&self, grid: &mut G, a: Position, b: Position, rng: &mut R) -> SwapOutcome
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        if !is_swap_allowed_by_chains(grid, a, b) {
            tracing::trace!(?a, ?b, "swap.rejected_by_chains");
            return SwapOutcome::RejectedByChains;
        }
        if self.sticky_boundary && self.is_pinned_to_boundary(grid, a, b) {
            tracing::trace!(?a, ?b, "swap.rejected_by_boundary");
            return SwapOutcome::RejectedByBoundary;
        }
        let delta = delta_energy(grid, a, b, self.omega);
        let probability = acceptance_probability(delta, self.delta_e_min);
        if rng.gen::<f64>() < probability {
            grid.swap_sites(a, b);
            tracing::trace!(?a, ?b, delta, "swap.accepted");
            SwapOutcome::Accepted
        } else {
            tracing::trace!(?a, ?b, delta, probability, "swap.rejected_by_energy");
            SwapOutcome::RejectedByEnergy
        }
    }

    /// Either endpoint is inactive chromatin on the outer interior ring.
    pub fn is_pinned_to_boundary<G: SiteGrid + ?Sized>(&self, grid: &G, a: Position, b: Position) -> bool {
        [a, b].into_iter().any(|(column, row)| {
            grid.site(column, row).is_inactive_chromatin() && grid.is_next_to_boundary(column, row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{ChemicalState, Flags, Lattice, LatticeInitializer, Site};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rbp() -> Site {
        Site::new(ChemicalState::inactive_rbp(), Flags::default())
    }

    #[test]
    fn test_identical_free_sites_never_swap() {
        let mut lattice = Lattice::new(6, 6).unwrap();
        let before = lattice.clone();
        let engine = SwapEngine::new(0.0, false);
        let mut rng = StdRng::seed_from_u64(11);
        for (column, row) in before.positions() {
            for _ in 0..20 {
                assert!(!engine.attempt_swap(&mut lattice, column, row, &mut rng));
            }
        }
        assert_eq!(lattice.render_levels(), before.render_levels());
    }

    #[test]
    fn test_zero_omega_accepts_with_base_probability() {
        // delta_e_min is 0 when omega is 0, so every legal swap succeeds
        let mut lattice = Lattice::new(4, 4).unwrap();
        lattice.set(2, 2, rbp());
        let engine = SwapEngine::new(0.0, false);
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = engine.attempt_swap_with(&mut lattice, (2, 2), (3, 2), &mut rng);
        assert_eq!(outcome, SwapOutcome::Accepted);
        assert!(lattice.get(3, 2).is_rbp());
        assert!(lattice.get(2, 2).is_chromatin());
    }

    #[test]
    fn test_full_record_swap_is_involution() {
        let mut lattice = Lattice::new(5, 5).unwrap();
        LatticeInitializer::new(&mut lattice)
            .single_chain(0, ChemicalState::active_chromatin(), Flags::new(true, false))
            .unwrap();
        lattice.site_mut(3, 2).set_rna_content(4);
        let (a, b) = (*lattice.get(3, 2), *lattice.get(4, 3));
        lattice.swap_sites((3, 2), (4, 3));
        assert_eq!(lattice.get(4, 3), &a);
        assert_eq!(lattice.get(3, 2), &b);
        lattice.swap_sites((3, 2), (4, 3));
        assert_eq!(lattice.get(3, 2), &a);
        assert_eq!(lattice.get(4, 3), &b);
    }

    #[test]
    fn test_sticky_boundary_pins_inactive_chromatin() {
        let mut lattice = Lattice::new(4, 4).unwrap();
        lattice.set(2, 2, rbp());
        let mut rng = StdRng::seed_from_u64(9);
        let sticky = SwapEngine::new(0.0, true);
        // (1,2) is inactive chromatin on the edge
        assert_eq!(
            sticky.attempt_swap_with(&mut lattice, (2, 2), (1, 2), &mut rng),
            SwapOutcome::RejectedByBoundary
        );
        lattice.set(1, 2, rbp());
        lattice.set(2, 2, Site::new(ChemicalState::active_chromatin(), Flags::default()));
        // Active chromatin is not pinned
        assert!(sticky
            .attempt_swap_with(&mut lattice, (2, 2), (1, 2), &mut rng)
            .is_accepted());
    }

    #[test]
    fn test_sticky_boundary_pins_starting_site() {
        let mut lattice = Lattice::new(4, 4).unwrap();
        lattice.set(2, 3, rbp());
        let mut rng = StdRng::seed_from_u64(9);
        let sticky = SwapEngine::new(0.0, true);
        // (1,3) is inactive chromatin on the edge and starts the move
        assert!(sticky.is_pinned_to_boundary(&lattice, (1, 3), (2, 3)));
        assert_eq!(
            sticky.attempt_swap_with(&mut lattice, (1, 3), (2, 3), &mut rng),
            SwapOutcome::RejectedByBoundary
        );
        assert!(lattice.get(2, 3).is_rbp());
        // Without the sticky boundary the same move goes through
        let free = SwapEngine::new(0.0, false);
        assert!(free
            .attempt_swap_with(&mut lattice, (1, 3), (2, 3), &mut rng)
            .is_accepted());
        assert!(lattice.get(1, 3).is_rbp());
    }

    #[test]
    fn test_chains_stay_connected_under_random_swaps() {
        let mut lattice = Lattice::new(20, 20).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        {
            let mut init = LatticeInitializer::new(&mut lattice);
            init.fill_randomly(0.4, ChemicalState::inactive_rbp(), Flags::default(), &mut rng);
            init.orthogonal_chains(2, -3, ChemicalState::inactive_chromatin(), Flags::default())
                .unwrap();
            init.pi_shaped_chains(ChemicalState::active_chromatin(), Flags::new(true, false))
                .unwrap();
        }
        assert!(lattice.broken_chain_links().is_empty());
        let engine = SwapEngine::new(0.0, false);
        let mut accepted = 0;
        for _ in 0..50_000 {
            let (column, row) = lattice.random_site(&mut rng);
            if engine.attempt_swap(&mut lattice, column, row, &mut rng) {
                accepted += 1;
            }
        }
        assert!(accepted > 0);
        assert!(lattice.broken_chain_links().is_empty());
    }

    #[test]
    fn test_negative_omega_uses_magnitude() {
        let engine = SwapEngine::new(-0.5, false);
        assert_eq!(engine.delta_e_min(), -5.0);
        let mut engine = SwapEngine::default();
        engine.set_omega(1.0);
        assert_eq!(engine.delta_e_min(), -10.0);
    }
}
