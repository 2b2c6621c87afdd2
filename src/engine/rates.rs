//! Rate constants of the chemical kinetics and the tau-leap step.

use std::fmt;

/// Names of the runtime-mutable rate constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rate {
    /// Chromatin becomes transcribable.
    On,
    /// Chromatin stops being transcribable.
    Off,
    /// Transcribable chromatin activates.
    ChromPlus,
    /// Active chromatin deactivates.
    ChromMinus,
    /// Active chromatin produces one RNA unit.
    RnaPlus,
    /// Decay of RNA bound to RBP or active chromatin.
    RnaMinusRbp,
    /// Decay of RNA at transcription sites. Stored, not used by the kinetics.
    RnaMinusTxn,
    /// Transfer of one RNA unit to one RBP neighbor.
    RnaTransfer,
}

impl Rate {
    pub const ALL: [Rate; 8] = [
        Rate::On,
        Rate::Off,
        Rate::ChromPlus,
        Rate::ChromMinus,
        Rate::RnaPlus,
        Rate::RnaMinusRbp,
        Rate::RnaMinusTxn,
        Rate::RnaTransfer,
    ];

    /// Conventional name of the constant (`kOn`, `kRnaPlus`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Rate::On => "kOn",
            Rate::Off => "kOff",
            Rate::ChromPlus => "kChromPlus",
            Rate::ChromMinus => "kChromMinus",
            Rate::RnaPlus => "kRnaPlus",
            Rate::RnaMinusRbp => "kRnaMinusRbp",
            Rate::RnaMinusTxn => "kRnaMinusTxn",
            Rate::RnaTransfer => "kRnaTransfer",
        }
    }

    /// Inverse of [`Rate::name`].
    pub fn from_name(name: &str) -> Option<Rate> {
        Rate::ALL.into_iter().find(|rate| rate.name() == name)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rate constants (per unit time) and the tau-leap step `dt_chem`.
///
/// Every transition probability is `dt_chem * rate`. The approximation is
/// only meaningful while that product stays well below 1; larger products
/// behave as certain events.
#[derive(Clone, Debug, PartialEq)]
pub struct RateConstants {
    /// Tau-leap time increment.
    pub dt_chem: f64,
    pub k_on: f64,
    pub k_off: f64,
    pub k_chrom_plus: f64,
    pub k_chrom_minus: f64,
    pub k_rna_plus: f64,
    pub k_rna_minus_rbp: f64,
    pub k_rna_minus_txn: f64,
    pub k_rna_transfer: f64,
}

impl Default for RateConstants {
    fn default() -> Self {
        Self {
            dt_chem: 1.0,
            k_on: 1.852e-4,
            k_off: 1.6666e-3,
            k_chrom_plus: 0.075,
            k_chrom_minus: 1.6666e-3,
            k_rna_plus: 1.1111e-1,
            k_rna_minus_rbp: 5.5555e-4,
            k_rna_minus_txn: 5.5555e-4,
            k_rna_transfer: 5.5555e-4,
        }
    }
}

impl RateConstants {
    #[inline]
    pub fn get(&self, rate: Rate) -> f64 {
        match rate {
            Rate::On => self.k_on,
            Rate::Off => self.k_off,
            Rate::ChromPlus => self.k_chrom_plus,
            Rate::ChromMinus => self.k_chrom_minus,
            Rate::RnaPlus => self.k_rna_plus,
            Rate::RnaMinusRbp => self.k_rna_minus_rbp,
            Rate::RnaMinusTxn => self.k_rna_minus_txn,
            Rate::RnaTransfer => self.k_rna_transfer,
        }
    }

    /// Overwrite one rate constant, warning when `dt_chem * value >= 1`.
    pub fn set(&mut self, rate: Rate, value: f64) {
        let slot = match rate {
            Rate::On => &mut self.k_on,
            Rate::Off => &mut self.k_off,
            Rate::ChromPlus => &mut self.k_chrom_plus,
            Rate::ChromMinus => &mut self.k_chrom_minus,
            Rate::RnaPlus => &mut self.k_rna_plus,
            Rate::RnaMinusRbp => &mut self.k_rna_minus_rbp,
            Rate::RnaMinusTxn => &mut self.k_rna_minus_txn,
            Rate::RnaTransfer => &mut self.k_rna_transfer,
        };
        let previous = std::mem::replace(slot, value);
        tracing::info!(rate = %rate, previous, value, "rates.set");
        self.warn_if_coarse(rate);
    }

    pub fn set_dt_chem(&mut self, dt_chem: f64) {
        tracing::info!(previous = self.dt_chem, dt_chem, "rates.set_dt_chem");
        self.dt_chem = dt_chem;
        for (rate, product) in self.tau_leap_violations() {
            tracing::warn!(rate = %rate, product, "rates.tau_leap_violation");
        }
    }

    /// Probability of one event of `rate` during one step.
    #[inline]
    pub fn probability(&self, rate: Rate) -> f64 {
        self.dt_chem * self.get(rate)
    }

    /// Rates whose per-step probability `dt_chem * rate` reaches 1.
    pub fn tau_leap_violations(&self) -> Vec<(Rate, f64)> {
        Rate::ALL
            .into_iter()
            .map(|rate| (rate, self.probability(rate)))
            .filter(|&(_, product)| product >= 1.0)
            .collect()
    }

    fn warn_if_coarse(&self, rate: Rate) {
        let product = self.probability(rate);
        if product >= 1.0 {
            tracing::warn!(rate = %rate, product, "rates.tau_leap_violation");
        }
    }
}
