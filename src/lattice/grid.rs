//! Dense lattice of sites with a one-cell halo.
//!
//! The interior is addressed with 1-based `(column, row)` coordinates in
//! `[1..=columns] x [1..=rows]`; the halo only exists so that neighbor
//! arithmetic never needs bounds checks. Storage is a single row-major
//! buffer of `(columns + 2) * (rows + 2)` sites.
//!
//! All read/write access used by the engines goes through [`SiteGrid`], which
//! is implemented both by the owning [`Lattice`] and by [`LatticeBand`], a
//! mutable view over a horizontal strip of the buffer. Bands produced by
//! [`Lattice::row_bands`] are disjoint, which is what lets a color round run
//! its swaps in parallel without locks.

use rand::Rng;

use super::site::{ChainId, ChainMembership, Site, Species};
use crate::error::{LatticeError, Result};

/// `(column, row)` coordinate on the lattice.
pub type Position = (i32, i32);

/// Index of the first interior row/column.
pub const FIRST_INDEX: i32 = 1;

/// Rows covered by a band on each side of its centre row.
pub const BAND_HALF_HEIGHT: i32 = 2;

/// Site access shared by the whole lattice and by row bands.
///
/// Coordinates are always global lattice coordinates.
pub trait SiteGrid {
    /// Number of interior columns.
    fn columns(&self) -> i32;

    /// Number of interior rows.
    fn rows(&self) -> i32;

    fn site(&self, column: i32, row: i32) -> &Site;

    fn site_mut(&mut self, column: i32, row: i32) -> &mut Site;

    /// Exchange the full records of two sites.
    fn swap_sites(&mut self, first: Position, second: Position);

    #[inline]
    fn is_within_interior(&self, column: i32, row: i32) -> bool {
        column >= FIRST_INDEX && column <= self.columns() && row >= FIRST_INDEX && row <= self.rows()
    }

    /// True on the outermost ring of interior sites.
    #[inline]
    fn is_next_to_boundary(&self, column: i32, row: i32) -> bool {
        column == FIRST_INDEX
            || column == self.columns()
            || row == FIRST_INDEX
            || row == self.rows()
    }

    /// Pick one of the 8 neighbors uniformly among those inside the interior.
    ///
    /// Rejection sampling: offsets are redrawn until they land on a distinct
    /// interior site. Requires an interior with at least two sites.
    fn random_neighbor_of<R: Rng + ?Sized>(&self, column: i32, row: i32, rng: &mut R) -> Position {
        loop {
            let neighbor_column = column + rng.gen_range(-1..=1);
            let neighbor_row = row + rng.gen_range(-1..=1);
            if (neighbor_column, neighbor_row) != (column, row)
                && self.is_within_interior(neighbor_column, neighbor_row)
            {
                return (neighbor_column, neighbor_row);
            }
        }
    }

    /// Interior neighbors (at most 8) whose site satisfies `predicate`.
    fn neighbors_matching<F>(&self, column: i32, row: i32, predicate: F) -> Vec<Position>
    where
        F: Fn(&Site) -> bool,
    {
        let mut matching = Vec::with_capacity(8);
        for column_offset in -1..=1 {
            for row_offset in -1..=1 {
                if column_offset == 0 && row_offset == 0 {
                    continue;
                }
                let neighbor = (column + column_offset, row + row_offset);
                if self.is_within_interior(neighbor.0, neighbor.1)
                    && predicate(self.site(neighbor.0, neighbor.1))
                {
                    matching.push(neighbor);
                }
            }
        }
        matching
    }
}

/// Owned lattice of sites.
#[derive(Clone, Debug)]
pub struct Lattice {
    columns: i32,
    rows: i32,
    sites: Vec<Site>,
    next_chain_id: ChainId,
}

impl Lattice {
    /// Create a zero-initialized lattice (every site inactive chromatin).
    ///
    /// The interior must hold at least two sites, otherwise no site has a
    /// neighbor to swap with.
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        let invalid = || LatticeError::InvalidDimensions {
            columns: columns as i64,
            rows: rows as i64,
        };
        let too_large = columns >= i32::MAX as usize - 2 || rows >= i32::MAX as usize - 2;
        if too_large || columns.saturating_mul(rows) < 2 {
            return Err(invalid());
        }
        let cells = (columns + 2)
            .checked_mul(rows + 2)
            .ok_or_else(invalid)?;
        Ok(Self {
            columns: columns as i32,
            rows: rows as i32,
            sites: vec![Site::default(); cells],
            next_chain_id: 1,
        })
    }

    #[inline]
    fn stride(&self) -> usize {
        self.columns as usize + 2
    }

    #[inline]
    fn index(&self, column: i32, row: i32) -> usize {
        debug_assert!(column >= 0 && column <= self.columns + 1);
        debug_assert!(row >= 0 && row <= self.rows + 1);
        row as usize * self.stride() + column as usize
    }

    #[inline]
    pub fn first_row(&self) -> i32 {
        FIRST_INDEX
    }

    #[inline]
    pub fn last_row(&self) -> i32 {
        self.rows
    }

    #[inline]
    pub fn first_column(&self) -> i32 {
        FIRST_INDEX
    }

    #[inline]
    pub fn last_column(&self) -> i32 {
        self.columns
    }

    /// Number of interior sites.
    pub fn area(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn get(&self, column: i32, row: i32) -> &Site {
        self.site(column, row)
    }

    pub fn set(&mut self, column: i32, row: i32, value: Site) {
        *self.site_mut(column, row) = value;
    }

    /// Uniformly chosen interior coordinate.
    pub fn random_site<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        (
            rng.gen_range(FIRST_INDEX..=self.columns),
            rng.gen_range(FIRST_INDEX..=self.rows),
        )
    }

    /// All interior coordinates in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let columns = self.columns;
        (FIRST_INDEX..=self.rows)
            .flat_map(move |row| (FIRST_INDEX..=columns).map(move |column| (column, row)))
    }

    /// Allocate the next chain identifier (1, 2, 3, ...).
    pub fn new_chain_id(&mut self) -> ChainId {
        let chain_id = self.next_chain_id;
        self.next_chain_id += 1;
        tracing::info!(chain_id, "lattice.new_chain");
        chain_id
    }

    /// Record a chain membership on a site.
    ///
    /// Fails with [`LatticeError::ChainCapacity`] when the site already
    /// belongs to two chains.
    pub fn set_chain_membership(
        &mut self,
        column: i32,
        row: i32,
        chain_id: ChainId,
        position: u32,
        length: u32,
    ) -> Result<usize> {
        if chain_id == 0 || length == 0 || position >= length {
            return Err(LatticeError::InvalidChain(format!(
                "membership (id={chain_id}, position={position}, length={length}) is not well formed"
            )));
        }
        if !self.is_within_interior(column, row) {
            return Err(LatticeError::OutsideInterior { column, row });
        }
        self.site_mut(column, row)
            .push_chain(ChainMembership::new(chain_id, position, length))
            .ok_or_else(|| {
                tracing::error!(column, row, chain_id, "lattice.too_many_crossing_chains");
                LatticeError::ChainCapacity {
                    column,
                    row,
                    chain_id,
                }
            })
    }

    /// Number of interior sites holding `species`.
    pub fn species_count(&self, species: Species) -> usize {
        self.positions()
            .filter(|&(column, row)| self.site(column, row).species() == species)
            .count()
    }

    /// Total RNA held across the interior.
    pub fn total_rna(&self) -> u64 {
        self.positions()
            .map(|(column, row)| self.site(column, row).rna_content() as u64)
            .sum()
    }

    /// Split the buffer into disjoint horizontal bands, one per interior row
    /// congruent to `row_phase` (mod 5).
    ///
    /// Each band spans its centre row +/- 2, clipped to the halo. A swap
    /// started on the centre row reads and writes only inside that window,
    /// so bands can be processed concurrently.
    pub fn row_bands(&mut self, row_phase: i32) -> Vec<LatticeBand<'_>> {
        let stride = self.stride();
        let columns = self.columns;
        let rows = self.rows;
        let mut bands = Vec::new();
        let mut rest: &mut [Site] = &mut self.sites;
        let mut rest_first_row = 0;
        let mut center_row = FIRST_INDEX + row_phase;
        while center_row <= rows {
            let first_row = (center_row - BAND_HALF_HEIGHT).max(0);
            let last_row = (center_row + BAND_HALF_HEIGHT).min(rows + 1);
            let skipped = (first_row - rest_first_row) as usize * stride;
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(skipped);
            let len = (last_row - first_row + 1) as usize * stride;
            let (band, tail) = tail.split_at_mut(len);
            bands.push(LatticeBand {
                sites: band,
                first_row,
                center_row,
                stride,
                columns,
                rows,
            });
            rest = tail;
            rest_first_row = last_row + 1;
            center_row += 2 * BAND_HALF_HEIGHT + 1;
        }
        bands
    }
}

impl SiteGrid for Lattice {
    #[inline]
    fn columns(&self) -> i32 {
        self.columns
    }

    #[inline]
    fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    fn site(&self, column: i32, row: i32) -> &Site {
        &self.sites[self.index(column, row)]
    }

    #[inline]
    fn site_mut(&mut self, column: i32, row: i32) -> &mut Site {
        let index = self.index(column, row);
        &mut self.sites[index]
    }

    fn swap_sites(&mut self, first: Position, second: Position) {
        let a = self.index(first.0, first.1);
        let b = self.index(second.0, second.1);
        self.sites.swap(a, b);
    }
}

/// Mutable view over rows `first_row ..= first_row + height - 1` of a lattice.
#[derive(Debug)]
pub struct LatticeBand<'a> {
    sites: &'a mut [Site],
    first_row: i32,
    center_row: i32,
    stride: usize,
    columns: i32,
    rows: i32,
}

impl<'a> LatticeBand<'a> {
    /// The interior row whose sites this band was cut for.
    #[inline]
    pub fn center_row(&self) -> i32 {
        self.center_row
    }

    #[inline]
    pub fn first_row(&self) -> i32 {
        self.first_row
    }

    /// Number of buffer rows in the band (halo rows included).
    #[inline]
    pub fn height(&self) -> i32 {
        (self.sites.len() / self.stride) as i32
    }

    #[inline]
    fn index(&self, column: i32, row: i32) -> usize {
        debug_assert!(
            row >= self.first_row && row < self.first_row + self.height(),
            "row {row} outside band starting at {}",
            self.first_row
        );
        (row - self.first_row) as usize * self.stride + column as usize
    }
}

impl SiteGrid for LatticeBand<'_> {
    #[inline]
    fn columns(&self) -> i32 {
        self.columns
    }

    #[inline]
    fn rows(&self) -> i32 {
        self.rows
    }

    #[inline]
    fn site(&self, column: i32, row: i32) -> &Site {
        &self.sites[self.index(column, row)]
    }

    #[inline]
    fn site_mut(&mut self, column: i32, row: i32) -> &mut Site {
        let index = self.index(column, row);
        &mut self.sites[index]
    }

    fn swap_sites(&mut self, first: Position, second: Position) {
        let a = self.index(first.0, first.1);
        let b = self.index(second.0, second.1);
        self.sites.swap(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::site::ChemicalState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(Lattice::new(0, 10).is_err());
        assert!(Lattice::new(10, 0).is_err());
        assert!(Lattice::new(1, 1).is_err());
        assert!(Lattice::new(1, 2).is_ok());
    }

    #[test]
    fn test_get_set_interior() {
        let mut lattice = Lattice::new(4, 3).unwrap();
        let site = Site::new(ChemicalState::active_rbp(), Default::default());
        lattice.set(4, 3, site);
        assert_eq!(lattice.get(4, 3), &site);
        assert!(lattice.get(1, 1).is_inactive_chromatin());
        assert_eq!(lattice.positions().count(), 12);
        assert_eq!(lattice.area(), 12);
    }

    #[test]
    fn test_random_site_is_interior() {
        let lattice = Lattice::new(7, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let (column, row) = lattice.random_site(&mut rng);
            assert!(lattice.is_within_interior(column, row));
        }
    }

    #[test]
    fn test_random_neighbor_in_corner() {
        let lattice = Lattice::new(5, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2000 {
            let neighbor = lattice.random_neighbor_of(1, 1, &mut rng);
            assert!(lattice.is_within_interior(neighbor.0, neighbor.1));
            assert_ne!(neighbor, (1, 1));
            assert!((neighbor.0 - 1).abs() <= 1 && (neighbor.1 - 1).abs() <= 1);
            seen.insert(neighbor);
        }
        // Corner site has exactly three interior neighbors
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_neighbors_matching_skips_halo() {
        let mut lattice = Lattice::new(3, 3).unwrap();
        lattice.set(2, 1, Site::new(ChemicalState::inactive_rbp(), Default::default()));
        lattice.set(2, 2, Site::new(ChemicalState::inactive_rbp(), Default::default()));
        let rbp = lattice.neighbors_matching(1, 1, |s| s.is_rbp());
        assert_eq!(rbp.len(), 2);
        let chromatin = lattice.neighbors_matching(1, 1, |s| s.is_chromatin());
        // Only (1, 2) remains: halo cells are never reported
        assert_eq!(chromatin, vec![(1, 2)]);
    }

    #[test]
    fn test_boundary_predicate() {
        let lattice = Lattice::new(4, 4).unwrap();
        assert!(lattice.is_next_to_boundary(1, 2));
        assert!(lattice.is_next_to_boundary(3, 4));
        assert!(!lattice.is_next_to_boundary(2, 3));
    }

    #[test]
    fn test_chain_ids_are_monotonic() {
        let mut lattice = Lattice::new(3, 3).unwrap();
        assert_eq!(lattice.new_chain_id(), 1);
        assert_eq!(lattice.new_chain_id(), 2);
        assert_eq!(lattice.new_chain_id(), 3);
    }

    #[test]
    fn test_chain_membership_capacity() {
        let mut lattice = Lattice::new(3, 3).unwrap();
        lattice.set_chain_membership(2, 2, 1, 0, 3).unwrap();
        lattice.set_chain_membership(2, 2, 2, 1, 3).unwrap();
        let err = lattice.set_chain_membership(2, 2, 3, 0, 3).unwrap_err();
        assert!(matches!(err, LatticeError::ChainCapacity { chain_id: 3, .. }));
        assert!(lattice.set_chain_membership(2, 2, 0, 0, 3).is_err());
        assert!(lattice.set_chain_membership(0, 2, 4, 0, 3).is_err());
    }

    #[test]
    fn test_row_bands_are_disjoint_and_cover_colored_rows() {
        let mut lattice = Lattice::new(6, 12).unwrap();
        for phase in 0..5 {
            let bands = lattice.row_bands(phase);
            let centers: Vec<i32> = bands.iter().map(|b| b.center_row()).collect();
            let expected: Vec<i32> = (1 + phase..=12).step_by(5).collect();
            assert_eq!(centers, expected);
            let mut previous_end = -1;
            for band in &bands {
                assert!(band.first_row() > previous_end);
                assert!(band.first_row() <= band.center_row() - 2 || band.first_row() == 0);
                let end = band.first_row() + band.height() - 1;
                assert!(end >= band.center_row() + 2 || end == 13);
                previous_end = end;
            }
        }
    }

    #[test]
    fn test_band_writes_land_in_lattice() {
        let mut lattice = Lattice::new(5, 10).unwrap();
        let rbp = Site::new(ChemicalState::active_rbp(), Default::default());
        {
            let mut bands = lattice.row_bands(2);
            let band = &mut bands[1];
            assert_eq!(band.center_row(), 8);
            *band.site_mut(3, 9) = rbp;
            band.swap_sites((3, 9), (4, 10));
        }
        assert_eq!(lattice.get(4, 10), &rbp);
        assert!(lattice.get(3, 9).is_inactive_chromatin());
    }
}
