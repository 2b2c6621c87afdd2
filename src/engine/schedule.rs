//! Colored partition of the lattice for parallel swap rounds.
//!
//! The interior is split into 25 color classes by `(row mod 5, column mod 5)`.
//! Two sites of the same color are at least 5 cells apart, while a swap
//! started at a site reads and writes only within 2 cells of it, so all sites
//! of one color can be processed concurrently.
//!
//! Concurrency never needs locks: the lattice buffer is cut into disjoint
//! row bands (one per colored row) and each worker owns a contiguous group of
//! bands together with its private random stream. Results depend only on the
//! seed and the worker count, not on thread timing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::swap::SwapEngine;
use crate::error::{LatticeError, Result};
use crate::lattice::{Lattice, Position, SiteGrid, FIRST_INDEX};

/// Distance between two same-colored rows (or columns).
pub const COLOR_STRIDE: i32 = 5;

/// Number of color classes.
pub const COLOR_COUNT: usize = (COLOR_STRIDE * COLOR_STRIDE) as usize;

/// Colors extracted from one 128-bit draw by repeated `% 25`, `/ 25`.
/// `25^24` is close enough to `2^128` that the modulo bias stays near 1e-5.
pub const COLORS_PER_DRAW: u32 = 24;

/// 128-bit draws each worker contributes when the color pool refills.
pub const DRAWS_PER_WORKER: usize = 4;

/// Color class of an interior site.
#[inline]
pub fn color_of(column: i32, row: i32) -> usize {
    let row_phase = (row - FIRST_INDEX).rem_euclid(COLOR_STRIDE);
    let column_phase = (column - FIRST_INDEX).rem_euclid(COLOR_STRIDE);
    (row_phase * COLOR_STRIDE + column_phase) as usize
}

/// Every interior site of `color`, row by row.
pub fn sites_of_color(columns: i32, rows: i32, color: usize) -> impl Iterator<Item = Position> {
    let row_phase = color as i32 / COLOR_STRIDE;
    let column_phase = color as i32 % COLOR_STRIDE;
    (FIRST_INDEX + row_phase..=rows)
        .step_by(COLOR_STRIDE as usize)
        .flat_map(move |row| {
            (FIRST_INDEX + column_phase..=columns)
                .step_by(COLOR_STRIDE as usize)
                .map(move |column| (column, row))
        })
}

/// Shared supply of round colors, refilled in bulk from the worker streams.
#[derive(Clone, Debug, Default)]
pub struct ColorPool {
    draws: Vec<u128>,
    current: u128,
    remaining: u32,
}

impl ColorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colors still available before the next refill.
    pub fn available(&self) -> usize {
        self.remaining as usize + self.draws.len() * COLORS_PER_DRAW as usize
    }

    /// Next color, refilling from `streams` (in parallel) when exhausted.
    pub fn next_color(&mut self, streams: &mut [StdRng]) -> usize {
        if self.remaining == 0 {
            if self.draws.is_empty() {
                self.refill(streams);
            }
            self.current = self.draws.pop().unwrap_or_default();
            self.remaining = COLORS_PER_DRAW;
        }
        let color = (self.current % COLOR_COUNT as u128) as usize;
        self.current /= COLOR_COUNT as u128;
        self.remaining -= 1;
        color
    }

    fn refill(&mut self, streams: &mut [StdRng]) {
        let batches: Vec<Vec<u128>> = streams
            .par_iter_mut()
            .map(|rng| (0..DRAWS_PER_WORKER).map(|_| rng.gen::<u128>()).collect::<Vec<u128>>())
            .collect();
        self.draws = batches.into_iter().rev().flatten().collect();
        tracing::trace!(draws = self.draws.len(), "schedule.color_pool_refilled");
    }
}

/// One independent generator per worker.
///
/// With a seed, worker `i` uses `seed + 1 + i` (the master stream owns
/// `seed` itself); without one, every stream comes from entropy.
pub fn worker_streams(n_workers: usize, seed: Option<u64>) -> Vec<StdRng> {
    (0..n_workers as u64)
        .map(|i| match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1).wrapping_add(i)),
            None => StdRng::from_entropy(),
        })
        .collect()
}

/// Attempt a swap at every site of `color`, in parallel over row bands.
///
/// Must run inside the rayon pool that should do the work. Returns the
/// number of accepted swaps.
pub fn run_color_round(lattice: &mut Lattice, engine: &SwapEngine, color: usize, streams: &mut [StdRng]) -> u64 {
    let column_phase = color as i32 % COLOR_STRIDE;
    let mut bands = lattice.row_bands(color as i32 / COLOR_STRIDE);
    if bands.is_empty() || streams.is_empty() {
        return 0;
    }
    let bands_per_worker = (bands.len() + streams.len() - 1) / streams.len();
    bands
        .par_chunks_mut(bands_per_worker)
        .zip(streams.par_iter_mut())
        .map(|(group, rng)| {
            let mut accepted = 0u64;
            for band in group.iter_mut() {
                let row = band.center_row();
                let mut column = FIRST_INDEX + column_phase;
                while column <= band.columns() {
                    if engine.attempt_swap(band, column, row, rng) {
                        accepted += 1;
                    }
                    column += COLOR_STRIDE;
                }
            }
            accepted
        })
        .sum()
}

/// Concurrency/Partitioning Scheduler: worker pool, worker streams and the
/// shared color pool.
pub struct SwapScheduler {
    pool: rayon::ThreadPool,
    streams: Vec<StdRng>,
    colors: ColorPool,
}

impl SwapScheduler {
    /// Build a pool of `n_workers` threads (rayon's default when `None`).
    pub fn new(n_workers: Option<usize>, seed: Option<u64>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = n_workers {
            builder = builder.num_threads(n.max(1));
        }
        let pool = builder.build().map_err(|e| {
            tracing::error!(error = %e, "schedule.thread_pool_failed");
            LatticeError::ThreadPool(e.to_string())
        })?;
        let streams = worker_streams(pool.current_num_threads(), seed);
        tracing::info!(workers = streams.len(), seeded = seed.is_some(), "schedule.created");
        Ok(Self {
            pool,
            streams,
            colors: ColorPool::new(),
        })
    }

    pub fn n_workers(&self) -> usize {
        self.streams.len()
    }

    /// Run `rounds` sequential color rounds; returns the accepted swaps.
    pub fn perform_rounds(&mut self, lattice: &mut Lattice, engine: &SwapEngine, rounds: u64) -> u64 {
        let Self {
            pool,
            streams,
            colors,
        } = self;
        let accepted = pool.install(|| {
            let mut accepted = 0;
            for _ in 0..rounds {
                let color = colors.next_color(streams);
                accepted += run_color_round(lattice, engine, color, streams);
            }
            accepted
        });
        tracing::debug!(rounds, accepted, "schedule.rounds_performed");
        accepted
    }
}
