//! Contact energy of a candidate swap.
//!
//! Only contacts that actually change are evaluated: for a swap of A with
//! its neighbor B at offset `d`, the cells adjacent to A but not to B (A's
//! far side) and the cells adjacent to B but not to A (B's far side). Cells
//! adjacent to both keep seeing both records, so their contacts cancel.
//! Diagonal swaps leave out the far corner `A - d` (and `B + d`), so a far
//! side holds 3 or 4 cells.

use crate::lattice::{Position, Site, SiteGrid};

/// Upper bound of far-side cells on one side (diagonal swaps).
pub const MAX_FAR_SIDE: usize = 4;

/// Contact count behind `delta_e_min = -10 |omega|`. Exceeds the
/// `2 * MAX_FAR_SIDE` contacts a swap can actually change.
pub const MAX_CONTACTS_CHANGED: f64 = 10.0;

/// Asymmetric pair rule: does `site` pay `omega` for touching `neighbor`?
///
/// Engaged chromatin (active or holding RNA) dislikes any chromatin contact,
/// silent chromatin dislikes engaged neighbors, and active RBP dislikes
/// silent chromatin. Inactive RBP is indifferent.
#[inline]
pub fn requires_energy_cost(site: &Site, neighbor: &Site) -> bool {
    if site.is_chromatin() {
        if site.is_active_or_rna_bearing() {
            neighbor.is_chromatin()
        } else {
            neighbor.is_active_or_rna_bearing()
        }
    } else if site.is_active_rbp() {
        neighbor.is_chromatin() && !neighbor.is_active_or_rna_bearing()
    } else {
        false
    }
}

/// Cells adjacent to `origin` that are not adjacent to `origin + toward`,
/// minus the corner opposite `toward`.
///
/// Three cells for an axis-aligned `toward`, four for a diagonal one.
#[derive(Clone, Copy, Debug)]
pub struct FarSide {
    cells: [Position; MAX_FAR_SIDE],
    len: usize,
}

impl FarSide {
    pub fn new(origin: Position, toward: (i32, i32)) -> Self {
        let mut cells = [(0, 0); MAX_FAR_SIDE];
        let mut len = 0;
        let far_corner = (-toward.0, -toward.1);
        for offset_x in -1..=1 {
            for offset_y in -1..=1 {
                let offset = (offset_x, offset_y);
                let touches_target =
                    (offset_x - toward.0).abs() <= 1 && (offset_y - toward.1).abs() <= 1;
                let skipped = offset == (0, 0)
                    || touches_target
                    || (toward.0 != 0 && toward.1 != 0 && offset == far_corner);
                if !skipped && len < MAX_FAR_SIDE {
                    cells[len] = (origin.0 + offset_x, origin.1 + offset_y);
                    len += 1;
                }
            }
        }
        Self { cells, len }
    }

    pub fn cells(&self) -> &[Position] {
        &self.cells[..self.len]
    }

    /// Costly contacts `site` would have if placed at the origin.
    /// Halo cells never contribute.
    pub fn costly_contacts<G: SiteGrid + ?Sized>(&self, grid: &G, site: &Site) -> u32 {
        self.cells()
            .iter()
            .filter(|&&(column, row)| {
                grid.is_within_interior(column, row)
                    && requires_energy_cost(site, grid.site(column, row))
            })
            .count() as u32
    }
}

/// `post - pre` contact energy for exchanging the records at `a` and `b`.
pub fn delta_energy<G: SiteGrid + ?Sized>(grid: &G, a: Position, b: Position, omega: f64) -> f64 {
    let offset = (b.0 - a.0, b.1 - a.1);
    let a_side = FarSide::new(a, offset);
    let b_side = FarSide::new(b, (-offset.0, -offset.1));
    let site_a = *grid.site(a.0, a.1);
    let site_b = *grid.site(b.0, b.1);

    let pre = a_side.costly_contacts(grid, &site_a) + b_side.costly_contacts(grid, &site_b);
    let post = a_side.costly_contacts(grid, &site_b) + b_side.costly_contacts(grid, &site_a);
    omega * (f64::from(post) - f64::from(pre))
}

/// Metropolis-style acceptance with a fixed offset instead of a clamp:
/// `exp(delta_e_min - delta)` stays at or below 1 for every reachable delta
/// when `delta_e_min = -MAX_CONTACTS_CHANGED * |omega|`.
#[inline]
pub fn acceptance_probability(delta_energy: f64, delta_e_min: f64) -> f64 {
    (delta_e_min - delta_energy).exp()
}
