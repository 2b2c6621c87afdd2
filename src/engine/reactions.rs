//! Per-site stochastic chemistry, integrated with fixed tau-leap steps.
//!
//! One invocation runs two ordered passes over the interior: RNA decay
//! first, then activity/transcribability switching, RNA production and RNA
//! transfer to neighboring RBP. Every event fires with probability
//! `dt_chem * rate` (scaled by the neighbor count for transfers).

use std::collections::BTreeSet;
use std::ops::AddAssign;

use rand::Rng;

use super::rates::{Rate, RateConstants};
use crate::lattice::{Activity, ChainId, SiteGrid, FIRST_INDEX};

/// State changes performed by one reaction invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    pub activity_switches: u64,
    pub transcribability_switches: u64,
    pub rna_produced: u64,
    pub rna_decayed: u64,
    pub rna_transferred: u64,
    pub rbp_deactivations: u64,
}

impl ReactionCounts {
    pub fn total(&self) -> u64 {
        self.activity_switches
            + self.transcribability_switches
            + self.rna_produced
            + self.rna_decayed
            + self.rna_transferred
            + self.rbp_deactivations
    }
}

impl AddAssign for ReactionCounts {
    fn add_assign(&mut self, other: Self) {
        self.activity_switches += other.activity_switches;
        self.transcribability_switches += other.transcribability_switches;
        self.rna_produced += other.rna_produced;
        self.rna_decayed += other.rna_decayed;
        self.rna_transferred += other.rna_transferred;
        self.rbp_deactivations += other.rbp_deactivations;
    }
}

/// Chemical Reaction Engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReactionEngine {
    rates: RateConstants,
}

impl ReactionEngine {
    pub fn new(rates: RateConstants) -> Self {
        for (rate, product) in rates.tau_leap_violations() {
            tracing::warn!(rate = %rate, product, "reactions.tau_leap_violation");
        }
        Self { rates }
    }

    #[inline]
    pub fn rates(&self) -> &RateConstants {
        &self.rates
    }

    pub fn rates_mut(&mut self) -> &mut RateConstants {
        &mut self.rates
    }

    pub fn set_rates(&mut self, rates: RateConstants) {
        tracing::info!(?rates, "reactions.set_rates");
        *self = Self::new(rates);
    }

    /// Run the decay pass, then the production/transfer pass.
    pub fn perform_chemical_reactions<G, R>(&self, grid: &mut G, rng: &mut R) -> ReactionCounts
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        let mut counts = ReactionCounts::default();
        for row in FIRST_INDEX..=grid.rows() {
            for column in FIRST_INDEX..=grid.columns() {
                counts += self.decay_at(grid, column, row, rng);
            }
        }
        for row in FIRST_INDEX..=grid.rows() {
            for column in FIRST_INDEX..=grid.columns() {
                counts += self.production_transfer_at(grid, column, row, rng);
            }
        }
        tracing::debug!(?counts, total = counts.total(), "reactions.performed");
        counts
    }

    /// RNA decay on RBP and active chromatin; RBP left without RNA goes
    /// inactive.
    pub fn decay_at<G, R>(&self, grid: &mut G, column: i32, row: i32, rng: &mut R) -> ReactionCounts
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        let mut counts = ReactionCounts::default();
        let p_decay = self.rates.probability(Rate::RnaMinusRbp);
        let site = grid.site_mut(column, row);
        if site.is_rbp() || site.is_active_chromatin() {
            for _ in 0..site.rna_content() {
                if bernoulli(rng, p_decay) && site.decrement_rna() {
                    counts.rna_decayed += 1;
                }
            }
        }
        if site.is_active_rbp() && site.rna_content() == 0 {
            site.set_activity(Activity::NotActive);
            counts.rbp_deactivations += 1;
        }
        counts
    }

    /// Chromatin switching, RNA production on active chromatin and RNA
    /// transfer from chromatin to its RBP neighbors.
    pub fn production_transfer_at<G, R>(&self, grid: &mut G, column: i32, row: i32, rng: &mut R) -> ReactionCounts
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        let mut counts = ReactionCounts::default();
        let rates = &self.rates;
        let site = grid.site_mut(column, row);
        if !site.is_chromatin() {
            return counts;
        }

        if site.is_active() {
            if bernoulli(rng, rates.probability(Rate::ChromMinus)) {
                site.set_activity(Activity::NotActive);
                counts.activity_switches += 1;
            }
        } else if site.is_transcribable() && bernoulli(rng, rates.probability(Rate::ChromPlus)) {
            site.set_activity(Activity::Active);
            counts.activity_switches += 1;
        }

        if site.is_transcribable() {
            if bernoulli(rng, rates.probability(Rate::Off)) {
                site.set_transcribable(false);
                counts.transcribability_switches += 1;
            }
        } else if !site.is_transcription_inhibited() && bernoulli(rng, rates.probability(Rate::On)) {
            site.set_transcribable(true);
            counts.transcribability_switches += 1;
        }

        if site.is_active() && bernoulli(rng, rates.probability(Rate::RnaPlus)) {
            site.increment_rna();
            counts.rna_produced += 1;
        }

        let rna_content = site.rna_content();
        if rna_content > 0 {
            counts.rna_transferred = self.transfer_rna(grid, column, row, rna_content, rng);
        }
        counts
    }

    /// Move RNA units one by one to uniformly chosen RBP neighbors, which
    /// become active on receipt. Returns the number of units moved.
    fn transfer_rna<G, R>(&self, grid: &mut G, column: i32, row: i32, rna_content: u32, rng: &mut R) -> u64
    where
        G: SiteGrid + ?Sized,
        R: Rng + ?Sized,
    {
        let rbp_neighbors = grid.neighbors_matching(column, row, |site| site.is_rbp());
        if rbp_neighbors.is_empty() {
            return 0;
        }
        let p_transfer = self.rates.probability(Rate::RnaTransfer) * rbp_neighbors.len() as f64;
        let mut transferred = 0;
        for _ in 0..rna_content {
            if !bernoulli(rng, p_transfer) {
                continue;
            }
            let (target_column, target_row) = rbp_neighbors[rng.gen_range(0..rbp_neighbors.len())];
            if !grid.site_mut(column, row).decrement_rna() {
                break;
            }
            let target = grid.site_mut(target_column, target_row);
            target.increment_rna();
            target.set_activity(Activity::Active);
            transferred += 1;
        }
        transferred
    }

    /// Set or clear transcription inhibition on every site that belongs to
    /// one of `chain_ids`. Returns the number of sites touched.
    pub fn set_transcription_inhibition_on_chains<G>(grid: &mut G, chain_ids: &BTreeSet<ChainId>, inhibited: bool) -> usize
    where
        G: SiteGrid + ?Sized,
    {
        let mut touched = 0;
        for row in FIRST_INDEX..=grid.rows() {
            for column in FIRST_INDEX..=grid.columns() {
                let site = grid.site_mut(column, row);
                if site.belongs_to_any(chain_ids) {
                    site.set_transcription_inhibited(inhibited);
                    touched += 1;
                }
            }
        }
        tracing::info!(?chain_ids, inhibited, touched, "reactions.chain_inhibition");
        touched
    }
}

/// Probabilities at or above 1 always fire.
#[inline]
fn bernoulli<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}
