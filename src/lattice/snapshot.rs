//! Raster views of the lattice interior for rendering and logging.
//!
//! Every map has shape `(rows, columns)`; element `[[r, c]]` describes the
//! site at lattice coordinate `(c + 1, r + 1)`.

use ndarray::Array2;

use super::grid::{Lattice, SiteGrid};
use super::site::Site;

/// Grey level for each of the four chemical states.
pub const LEVEL_INACTIVE_CHROMATIN: u8 = 0;
pub const LEVEL_ACTIVE_CHROMATIN: u8 = 1;
pub const LEVEL_INACTIVE_RBP: u8 = 2;
pub const LEVEL_ACTIVE_RBP: u8 = 3;

impl Lattice {
    fn map_interior<T, F>(&self, f: F) -> Array2<T>
    where
        F: Fn(&Site) -> T,
    {
        let rows = self.rows() as usize;
        let columns = self.columns() as usize;
        Array2::from_shape_fn((rows, columns), |(r, c)| {
            f(self.site(c as i32 + 1, r as i32 + 1))
        })
    }

    /// 0 for chromatin, 1 for RBP.
    pub fn species_map(&self) -> Array2<u8> {
        self.map_interior(|site| u8::from(site.is_rbp()))
    }

    /// 1 where the site is active.
    pub fn activity_map(&self) -> Array2<u8> {
        self.map_interior(|site| u8::from(site.is_active()))
    }

    pub fn rna_map(&self) -> Array2<u32> {
        self.map_interior(Site::rna_content)
    }

    /// Four-level encoding of species and activity, one level per state.
    pub fn render_levels(&self) -> Array2<u8> {
        self.map_interior(|site| match (site.is_rbp(), site.is_active()) {
            (false, false) => LEVEL_INACTIVE_CHROMATIN,
            (false, true) => LEVEL_ACTIVE_CHROMATIN,
            (true, false) => LEVEL_INACTIVE_RBP,
            (true, true) => LEVEL_ACTIVE_RBP,
        })
    }
}
