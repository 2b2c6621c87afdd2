//! Bulk initialization of a lattice: uniform/random fills and chain layouts.
//!
//! Every chain-creating operation returns the set of chain ids it allocated.
//! With chain integrity disabled the same sites get their chemical state but
//! no membership, which is handy for comparing constrained and free runs.

use std::collections::BTreeSet;

use rand::Rng;

use super::grid::{Lattice, Position, SiteGrid};
use super::site::{ChainId, ChemicalState, Flags};
use crate::error::{LatticeError, Result};

/// One 8-connected step of a chain walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Displacement {
    pub dx: i32,
    pub dy: i32,
}

impl Displacement {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// A step must move to one of the 8 neighbors.
    pub fn is_unit_step(&self) -> bool {
        self.dx.abs() <= 1 && self.dy.abs() <= 1 && (self.dx, self.dy) != (0, 0)
    }
}

/// Writes initial state and chain memberships into a lattice.
pub struct LatticeInitializer<'a> {
    lattice: &'a mut Lattice,
    enforce_chain_integrity: bool,
}

impl<'a> LatticeInitializer<'a> {
    pub fn new(lattice: &'a mut Lattice) -> Self {
        Self {
            lattice,
            enforce_chain_integrity: true,
        }
    }

    /// Lay chains out without recording memberships.
    pub fn without_chain_integrity(mut self) -> Self {
        self.enforce_chain_integrity = false;
        self
    }

    /// Set every interior site to the same chemical and flag state.
    ///
    /// Returns the number of sites written.
    pub fn fill_interior(&mut self, chemical: ChemicalState, flags: Flags) -> usize {
        tracing::info!(?chemical, ?flags, "init.fill_interior");
        let positions: Vec<Position> = self.lattice.positions().collect();
        for &(column, row) in &positions {
            let site = self.lattice.site_mut(column, row);
            site.set_chemical_state(chemical);
            site.set_flags(flags);
        }
        positions.len()
    }

    /// Overwrite `round(ratio * area)` randomly chosen chain-free sites.
    ///
    /// Sites may be drawn more than once and chain sites are skipped, so the
    /// attempt count is capped at five times the area. Returns the number of
    /// writes actually performed.
    pub fn fill_randomly<R: Rng + ?Sized>(
        &mut self,
        ratio: f64,
        chemical: ChemicalState,
        flags: Flags,
        rng: &mut R,
    ) -> usize {
        let area = self.lattice.area();
        let target = (area as f64 * ratio.clamp(0.0, 1.0)).round() as usize;
        let max_attempts = 5 * area;
        let mut written = 0;
        let mut attempts = 0;
        while written < target && attempts < max_attempts {
            let (column, row) = self.lattice.random_site(rng);
            let site = self.lattice.site_mut(column, row);
            if !site.has_chains() {
                site.set_chemical_state(chemical);
                site.set_flags(flags);
                written += 1;
            }
            attempts += 1;
        }
        tracing::info!(ratio, written, target, "init.fill_randomly");
        written
    }

    /// One horizontal chain spanning all columns at `rows / 2 + offset`.
    pub fn single_chain(
        &mut self,
        offset_from_center: i32,
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<BTreeSet<ChainId>> {
        tracing::info!(offset_from_center, "init.single_chain");
        let row = self.lattice.rows() / 2 + offset_from_center;
        let chain_id = self.horizontal_chain(row, chemical, flags)?;
        Ok(chain_id.into_iter().collect())
    }

    /// Two horizontal chains `distance` rows apart, centred on the lattice.
    pub fn parallel_chains(
        &mut self,
        distance: i32,
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<BTreeSet<ChainId>> {
        tracing::info!(distance, "init.parallel_chains");
        let lower_row = (self.lattice.rows() + distance) / 2;
        let upper_row = lower_row - distance;
        self.check_row(lower_row)?;
        self.check_row(upper_row)?;
        let mut chain_ids = BTreeSet::new();
        chain_ids.extend(self.horizontal_chain(lower_row, chemical, flags)?);
        chain_ids.extend(self.horizontal_chain(upper_row, chemical, flags)?);
        Ok(chain_ids)
    }

    /// A vertical and a horizontal chain crossing at
    /// `(columns / 2 + x_offset, rows / 2 + y_offset)`.
    pub fn orthogonal_chains(
        &mut self,
        x_offset: i32,
        y_offset: i32,
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<BTreeSet<ChainId>> {
        tracing::info!(x_offset, y_offset, "init.orthogonal_chains");
        let chain_column = self.lattice.columns() / 2 + x_offset;
        let chain_row = self.lattice.rows() / 2 + y_offset;
        self.check_column(chain_column)?;
        self.check_row(chain_row)?;

        let mut chain_ids = BTreeSet::new();
        let vertical = self.allocate_chain_id();
        let rows = self.lattice.rows();
        for row in 1..=rows {
            self.place(chain_column, row, chemical, flags, vertical, (row - 1) as u32, rows as u32)?;
        }
        chain_ids.extend(vertical);
        chain_ids.extend(self.horizontal_chain(chain_row, chemical, flags)?);
        Ok(chain_ids)
    }

    /// Two chains shaped like a "pi": each owns one vertical leg and half of
    /// the shared bar along the bottom, meeting at the bar's middle site.
    pub fn pi_shaped_chains(
        &mut self,
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<BTreeSet<ChainId>> {
        tracing::info!("init.pi_shaped_chains");
        let rows = self.lattice.rows();
        let columns = self.lattice.columns();
        if rows < 2 || columns < 3 {
            return Err(LatticeError::InvalidChain(format!(
                "pi-shaped chains need at least 3x2 sites, lattice is {columns}x{rows}"
            )));
        }
        let start_row = (rows / 10).max(1);
        let end_row = rows + 1 - start_row;
        let start_column = (columns / 3).max(1);
        let end_column = columns + 1 - start_column;
        let shared_column = start_column + (end_column - start_column + 1) / 2;
        let left_length = ((end_row - start_row) + (shared_column - start_column) + 1) as u32;
        let right_length = ((end_row - start_row) + (end_column - shared_column) + 1) as u32;

        let left = self.allocate_chain_id();
        let right = self.allocate_chain_id();
        let mut left_position = 0u32;
        let mut right_position = 0u32;
        for row in start_row..end_row {
            self.place(start_column, row, chemical, flags, left, left_position, left_length)?;
            left_position += 1;
            self.place(end_column, row, chemical, flags, right, right_position, right_length)?;
            right_position += 1;
        }
        for column in start_column..=shared_column {
            self.place(column, end_row, chemical, flags, left, left_position, left_length)?;
            left_position += 1;
        }
        for column in (shared_column..=end_column).rev() {
            self.place(column, end_row, chemical, flags, right, right_position, right_length)?;
            right_position += 1;
        }
        if left_position != left_length || right_position != right_length {
            tracing::error!(left_position, left_length, right_position, right_length, "init.pi_length_mismatch");
            return Err(LatticeError::InvalidChain(
                "pi-shaped chain lengths do not match the sites placed".to_string(),
            ));
        }
        Ok(left.into_iter().chain(right).collect())
    }

    /// Walk `steps` from `start`, placing one chain site per visited cell.
    ///
    /// The whole walk is validated before anything is written: every step
    /// must be an 8-connected unit move and every visited cell must lie in
    /// the interior. Returns the new chain id and the walk's end position.
    pub fn chain_from_steps(
        &mut self,
        start: Position,
        steps: &[Displacement],
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<(BTreeSet<ChainId>, Position)> {
        tracing::info!(?start, steps = steps.len(), "init.chain_from_steps");
        let mut path = Vec::with_capacity(steps.len() + 1);
        let mut current = start;
        path.push(current);
        for step in steps {
            if !step.is_unit_step() {
                return Err(LatticeError::InvalidChain(format!(
                    "step ({}, {}) is not a move to a neighboring site",
                    step.dx, step.dy
                )));
            }
            current = (current.0 + step.dx, current.1 + step.dy);
            path.push(current);
        }
        if let Some(&(column, row)) = path
            .iter()
            .find(|&&(column, row)| !self.lattice.is_within_interior(column, row))
        {
            tracing::error!(column, row, "init.walk_left_interior");
            return Err(LatticeError::OutsideInterior { column, row });
        }

        let chain_id = self.allocate_chain_id();
        let length = path.len() as u32;
        for (position, &(column, row)) in path.iter().enumerate() {
            self.place(column, row, chemical, flags, chain_id, position as u32, length)?;
        }
        tracing::trace!(?current, "init.chain_from_steps_done");
        Ok((chain_id.into_iter().collect(), current))
    }

    fn horizontal_chain(
        &mut self,
        row: i32,
        chemical: ChemicalState,
        flags: Flags,
    ) -> Result<Option<ChainId>> {
        self.check_row(row)?;
        let chain_id = self.allocate_chain_id();
        let columns = self.lattice.columns();
        for column in 1..=columns {
            self.place(column, row, chemical, flags, chain_id, (column - 1) as u32, columns as u32)?;
        }
        Ok(chain_id)
    }

    fn allocate_chain_id(&mut self) -> Option<ChainId> {
        self.enforce_chain_integrity
            .then(|| self.lattice.new_chain_id())
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &mut self,
        column: i32,
        row: i32,
        chemical: ChemicalState,
        flags: Flags,
        chain_id: Option<ChainId>,
        position: u32,
        length: u32,
    ) -> Result<()> {
        if !self.lattice.is_within_interior(column, row) {
            return Err(LatticeError::OutsideInterior { column, row });
        }
        let site = self.lattice.site_mut(column, row);
        site.set_chemical_state(chemical);
        site.set_flags(flags);
        if let Some(chain_id) = chain_id {
            self.lattice
                .set_chain_membership(column, row, chain_id, position, length)?;
        }
        Ok(())
    }

    fn check_row(&self, row: i32) -> Result<()> {
        if row < 1 || row > self.lattice.rows() {
            return Err(LatticeError::OutsideInterior { column: 1, row });
        }
        Ok(())
    }

    fn check_column(&self, column: i32) -> Result<()> {
        if column < 1 || column > self.lattice.columns() {
            return Err(LatticeError::OutsideInterior { column, row: 1 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fill_interior() {
        let mut lattice = Lattice::new(5, 4).unwrap();
        let written = LatticeInitializer::new(&mut lattice)
            .fill_interior(ChemicalState::inactive_rbp(), Flags::default());
        assert_eq!(written, 20);
        assert_eq!(lattice.species_count(crate::lattice::Species::Rbp), 20);
    }

    #[test]
    fn test_fill_randomly_skips_chains() {
        let mut lattice = Lattice::new(10, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut init = LatticeInitializer::new(&mut lattice);
        init.single_chain(0, ChemicalState::active_chromatin(), Flags::new(true, false))
            .unwrap();
        let written = init.fill_randomly(0.3, ChemicalState::inactive_rbp(), Flags::default(), &mut rng);
        assert_eq!(written, 30);
        for column in 1..=10 {
            assert!(lattice.get(column, 5).is_active_chromatin());
        }
        assert!(lattice.species_count(crate::lattice::Species::Rbp) <= 30);
        assert!(lattice.species_count(crate::lattice::Species::Rbp) > 0);
    }

    #[test]
    fn test_single_chain_is_contiguous() {
        let mut lattice = Lattice::new(8, 6).unwrap();
        let ids = LatticeInitializer::new(&mut lattice)
            .single_chain(1, ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1]);
        let layout = lattice.chain_layout();
        assert_eq!(layout[&1].len(), 8);
        assert!(layout[&1].iter().all(|&(_, (_, row))| row == 4));
        assert_eq!(lattice.get(8, 4).membership_in(1).unwrap().length, 8);
        assert!(lattice.broken_chain_links().is_empty());
    }

    #[test]
    fn test_parallel_chains() {
        let mut lattice = Lattice::new(6, 10).unwrap();
        let ids = LatticeInitializer::new(&mut lattice)
            .parallel_chains(4, ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(lattice.get(3, 7).has_chains());
        assert!(lattice.get(3, 3).has_chains());
        assert!(lattice.broken_chain_links().is_empty());
    }

    #[test]
    fn test_orthogonal_chains_cross_once() {
        let mut lattice = Lattice::new(7, 7).unwrap();
        let ids = LatticeInitializer::new(&mut lattice)
            .orthogonal_chains(0, 0, ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(lattice.get(3, 3).chain_memberships().count(), 2);
        assert_eq!(lattice.get(3, 1).chain_memberships().count(), 1);
        assert!(lattice.broken_chain_links().is_empty());
    }

    #[test]
    fn test_pi_shaped_chains() {
        let mut lattice = Lattice::new(30, 20).unwrap();
        let ids = LatticeInitializer::new(&mut lattice)
            .pi_shaped_chains(ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(lattice.broken_chain_links().is_empty());
        let layout = lattice.chain_layout();
        // The shared bar site is the last position of both chains
        let (left_end, right_end) = (layout[&1].last().unwrap().1, layout[&2].last().unwrap().1);
        assert_eq!(left_end, right_end);
    }

    #[test]
    fn test_chain_from_steps() {
        let mut lattice = Lattice::new(6, 6).unwrap();
        let steps = [
            Displacement::new(1, 0),
            Displacement::new(1, 1),
            Displacement::new(0, 1),
        ];
        let (ids, end) = LatticeInitializer::new(&mut lattice)
            .chain_from_steps((2, 2), &steps, ChemicalState::active_chromatin(), Flags::default())
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(end, (4, 4));
        let membership = lattice.get(4, 4).membership_in(1).unwrap();
        assert_eq!((membership.position, membership.length), (3, 4));
        assert!(membership.is_last());
    }

    #[test]
    fn test_chain_walk_leaving_interior_fails_cleanly() {
        let mut lattice = Lattice::new(4, 4).unwrap();
        let steps = [Displacement::new(1, 0), Displacement::new(1, 0)];
        let err = LatticeInitializer::new(&mut lattice)
            .chain_from_steps((3, 1), &steps, ChemicalState::active_chromatin(), Flags::default())
            .unwrap_err();
        assert_eq!(err, LatticeError::OutsideInterior { column: 5, row: 1 });
        // Nothing was written
        assert!(lattice.chain_ids().is_empty());
        assert!(lattice.get(3, 1).is_inactive_chromatin());
    }

    #[test]
    fn test_chain_walk_rejects_long_steps() {
        let mut lattice = Lattice::new(4, 4).unwrap();
        let steps = [Displacement::new(2, 0)];
        let result = LatticeInitializer::new(&mut lattice).chain_from_steps(
            (1, 1),
            &steps,
            ChemicalState::active_chromatin(),
            Flags::default(),
        );
        assert!(matches!(result, Err(LatticeError::InvalidChain(_))));
    }

    #[test]
    fn test_third_crossing_chain_overflows() {
        let mut lattice = Lattice::new(5, 5).unwrap();
        let mut init = LatticeInitializer::new(&mut lattice);
        init.orthogonal_chains(0, 0, ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap();
        let steps = [Displacement::new(1, 1)];
        let err = init
            .chain_from_steps((2, 2), &steps, ChemicalState::inactive_chromatin(), Flags::default())
            .unwrap_err();
        // (2, 2) is where the two orthogonal chains already cross
        assert!(matches!(err, LatticeError::ChainCapacity { column: 2, row: 2, .. }));
    }

    #[test]
    fn test_without_chain_integrity() {
        let mut lattice = Lattice::new(5, 5).unwrap();
        let ids = LatticeInitializer::new(&mut lattice)
            .without_chain_integrity()
            .single_chain(0, ChemicalState::active_chromatin(), Flags::default())
            .unwrap();
        assert!(ids.is_empty());
        assert!(lattice.get(1, 2).is_active_chromatin());
        assert!(!lattice.get(1, 2).has_chains());
    }
}
