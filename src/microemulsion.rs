//! Simulation facade: one lattice, both engines, the worker pool and every
//! random stream, behind the interface external controllers drive.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::{Rate, RateConstants, ReactionCounts, ReactionEngine, SwapEngine, SwapScheduler, DEFAULT_OMEGA};
use crate::error::Result;
use crate::lattice::{ChainId, ChemicalState, Flags, Lattice, LatticeInitializer};

/// Configuration for a [`Microemulsion`].
#[derive(Clone, Debug, PartialEq)]
pub struct MicroemulsionConfig {
    /// Contact energy of a disfavored pair.
    pub omega: f64,
    /// Pin inactive chromatin on the outer interior ring.
    pub sticky_boundary: bool,
    /// Initial rate constants and tau-leap step.
    pub rates: RateConstants,
    /// Master seed. Worker streams derive from it; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Worker threads for swap rounds. `None` uses rayon's default.
    pub n_workers: Option<usize>,
}

impl Default for MicroemulsionConfig {
    fn default() -> Self {
        Self {
            omega: DEFAULT_OMEGA,
            sticky_boundary: false,
            rates: RateConstants::default(),
            seed: None,
            n_workers: None,
        }
    }
}

/// The coupled swap + chemistry simulation.
pub struct Microemulsion {
    lattice: Lattice,
    swaps: SwapEngine,
    reactions: ReactionEngine,
    scheduler: SwapScheduler,
    rng: StdRng,
}

impl Microemulsion {
    /// Wrap an initialized lattice.
    ///
    /// Builds the swap worker pool and seeds the master stream (`seed`) and
    /// one stream per worker (`seed + 1 + i`).
    ///
    /// # Arguments
    /// * `lattice` - Lattice after setup; chains and species already placed
    /// * `config` - Contact energy, sticky boundary, rates, seed and worker count
    ///
    /// # Returns
    /// * The simulation, or `LatticeError::ThreadPool` if the pool cannot be built
    pub fn new(lattice: Lattice, config: MicroemulsionConfig) -> Result<Self> {
        let scheduler = SwapScheduler::new(config.n_workers, config.seed)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::info!(
            columns = lattice.last_column(),
            rows = lattice.last_row(),
            omega = config.omega,
            sticky_boundary = config.sticky_boundary,
            workers = scheduler.n_workers(),
            "microemulsion.created"
        );
        Ok(Self {
            lattice,
            swaps: SwapEngine::new(config.omega, config.sticky_boundary),
            reactions: ReactionEngine::new(config.rates),
            scheduler,
            rng,
        })
    }

    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Mutable access for setup and perturbation collaborators.
    pub fn lattice_mut(&mut self) -> &mut Lattice {
        &mut self.lattice
    }

    pub fn into_lattice(self) -> Lattice {
        self.lattice
    }

    pub fn swap_engine(&self) -> &SwapEngine {
        &self.swaps
    }

    pub fn rates(&self) -> &RateConstants {
        self.reactions.rates()
    }

    pub fn n_workers(&self) -> usize {
        self.scheduler.n_workers()
    }

    /// Scatter `chemical` over `ratio` of the chain-free interior, drawing
    /// positions from the master stream.
    pub fn fill_randomly(&mut self, ratio: f64, chemical: ChemicalState, flags: Flags) -> usize {
        LatticeInitializer::new(&mut self.lattice).fill_randomly(ratio, chemical, flags, &mut self.rng)
    }

    /// One swap attempt at a uniformly chosen site. Returns 1 if it was
    /// accepted, 0 otherwise.
    pub fn perform_random_swap(&mut self) -> u64 {
        let (column, row) = self.lattice.random_site(&mut self.rng);
        u64::from(self.swaps.attempt_swap(&mut self.lattice, column, row, &mut self.rng))
    }

    /// Run parallel color rounds.
    ///
    /// Each round draws one of the 25 colors and attempts a swap at every
    /// site of that color, spread over the worker pool. Rounds run one after
    /// another.
    ///
    /// # Arguments
    /// * `rounds` - Number of color rounds
    ///
    /// # Returns
    /// * Number of accepted swaps over all rounds
    pub fn perform_random_swaps(&mut self, rounds: u64) -> u64 {
        self.scheduler
            .perform_rounds(&mut self.lattice, &self.swaps, rounds)
    }

    /// One decay pass followed by one production/transfer pass.
    pub fn perform_chemical_reactions(&mut self) -> ReactionCounts {
        self.reactions
            .perform_chemical_reactions(&mut self.lattice, &mut self.rng)
    }

    pub fn set_omega(&mut self, omega: f64) {
        self.swaps.set_omega(omega);
    }

    pub fn set_rate(&mut self, rate: Rate, value: f64) {
        self.reactions.rates_mut().set(rate, value);
    }

    pub fn set_rates(&mut self, rates: RateConstants) {
        self.reactions.set_rates(rates);
    }

    pub fn set_dt_chem(&mut self, dt_chem: f64) {
        self.reactions.rates_mut().set_dt_chem(dt_chem);
    }

    pub fn set_k_on(&mut self, value: f64) {
        self.set_rate(Rate::On, value);
    }

    pub fn set_k_off(&mut self, value: f64) {
        self.set_rate(Rate::Off, value);
    }

    pub fn set_k_chrom_plus(&mut self, value: f64) {
        self.set_rate(Rate::ChromPlus, value);
    }

    pub fn set_k_chrom_minus(&mut self, value: f64) {
        self.set_rate(Rate::ChromMinus, value);
    }

    pub fn set_k_rna_plus(&mut self, value: f64) {
        self.set_rate(Rate::RnaPlus, value);
    }

    pub fn set_k_rna_minus_rbp(&mut self, value: f64) {
        self.set_rate(Rate::RnaMinusRbp, value);
    }

    pub fn set_k_rna_minus_txn(&mut self, value: f64) {
        self.set_rate(Rate::RnaMinusTxn, value);
    }

    pub fn set_k_rna_transfer(&mut self, value: f64) {
        self.set_rate(Rate::RnaTransfer, value);
    }

    /// Clear transcription inhibition on the given chains. Returns the
    /// number of sites touched.
    pub fn enable_transcription_on_chains(&mut self, chain_ids: &BTreeSet<ChainId>) -> usize {
        ReactionEngine::set_transcription_inhibition_on_chains(&mut self.lattice, chain_ids, false)
    }

    /// Inhibit transcription on the given chains. Returns the number of
    /// sites touched.
    pub fn inhibit_transcription_on_chains(&mut self, chain_ids: &BTreeSet<ChainId>) -> usize {
        ReactionEngine::set_transcription_inhibition_on_chains(&mut self.lattice, chain_ids, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::SiteGrid;

    fn simulation(seed: u64) -> (Microemulsion, BTreeSet<ChainId>) {
        let mut lattice = Lattice::new(30, 30).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let chains = {
            let mut init = LatticeInitializer::new(&mut lattice);
            init.fill_randomly(0.3, ChemicalState::inactive_rbp(), Flags::default(), &mut rng);
            init.parallel_chains(6, ChemicalState::inactive_chromatin(), Flags::new(true, false))
                .unwrap()
        };
        let config = MicroemulsionConfig {
            seed: Some(seed),
            n_workers: Some(2),
            ..Default::default()
        };
        (Microemulsion::new(lattice, config).unwrap(), chains)
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (mut a, _) = simulation(12);
        let (mut b, _) = simulation(12);
        for _ in 0..5 {
            assert_eq!(a.perform_random_swaps(25), b.perform_random_swaps(25));
            assert_eq!(a.perform_chemical_reactions(), b.perform_chemical_reactions());
            assert_eq!(a.perform_random_swap(), b.perform_random_swap());
        }
        assert_eq!(a.lattice().render_levels(), b.lattice().render_levels());
        assert_eq!(a.lattice().rna_map(), b.lattice().rna_map());
    }

    #[test]
    fn test_long_run_keeps_invariants() {
        let (mut sim, _) = simulation(4);
        let rbp_before = sim.lattice().species_count(crate::lattice::Species::Rbp);
        sim.set_k_rna_transfer(0.05);
        let mut accepted = 0;
        for _ in 0..20 {
            accepted += sim.perform_random_swaps(25);
            sim.perform_chemical_reactions();
        }
        assert!(accepted > 0);
        assert!(sim.lattice().broken_chain_links().is_empty());
        // Swaps move species around but never convert them
        assert_eq!(sim.lattice().species_count(crate::lattice::Species::Rbp), rbp_before);
    }

    #[test]
    fn test_inhibition_silences_chains() {
        let (mut sim, chains) = simulation(6);
        assert_eq!(sim.inhibit_transcription_on_chains(&chains), 60);
        sim.set_k_on(1.0);
        sim.set_k_off(0.0);
        // Chains start transcribable; turning it off lets inhibition show
        for (column, row) in sim.lattice().sites_in_chains(&chains) {
            sim.lattice_mut().site_mut(column, row).set_transcribable(false);
        }
        sim.perform_chemical_reactions();
        for (column, row) in sim.lattice().sites_in_chains(&chains) {
            let site = sim.lattice().get(column, row);
            assert!(site.is_transcription_inhibited());
            assert!(!site.is_transcribable());
        }
        assert_eq!(sim.enable_transcription_on_chains(&chains), 60);
        sim.perform_chemical_reactions();
        for (column, row) in sim.lattice().sites_in_chains(&chains) {
            assert!(sim.lattice().get(column, row).is_transcribable());
        }
    }

    #[test]
    fn test_rate_setters() {
        let (mut sim, _) = simulation(1);
        sim.set_k_rna_plus(0.0);
        sim.set_k_chrom_plus(0.5);
        sim.set_dt_chem(0.5);
        assert_eq!(sim.rates().k_rna_plus, 0.0);
        assert_eq!(sim.rates().probability(Rate::ChromPlus), 0.25);
        sim.set_rates(RateConstants::default());
        assert_eq!(sim.rates(), &RateConstants::default());
        sim.set_omega(1.0);
        assert_eq!(sim.swap_engine().delta_e_min(), -10.0);
    }
}
