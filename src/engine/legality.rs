//! Chain-topology rules for exchanging two neighboring sites.
//!
//! A swap moves whole records, so every chain a moving site belongs to must
//! still be 8-connected once the site sits at its new position. The checks
//! below are local: they only look at the 3x3 neighborhoods of the two
//! endpoints, which keeps them inside a swap band.

use crate::lattice::{ChainIndex, ChainMembership, Position, SiteGrid};

/// Can the records at `a` and its neighbor `b` trade places without
/// breaking a chain?
///
/// Chain-free pairs are always allowed unless they are indistinguishable,
/// in which case exchanging them would change nothing.
pub fn is_swap_allowed_by_chains<G: SiteGrid + ?Sized>(grid: &G, a: Position, b: Position) -> bool {
    let site_a = *grid.site(a.0, a.1);
    let site_b = *grid.site(b.0, b.1);

    if !site_a.has_chains() && !site_b.has_chains() {
        return !site_a.is_indistinguishable_from(&site_b);
    }
    if grid.is_chain_neighbor_in_any(b.0, b.1, site_a.chain_memberships()) {
        return false;
    }

    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    match (dx != 0, dy != 0) {
        (true, true) => {
            if site_a.has_chains() && site_b.has_chains() {
                return false;
            }
            if site_a.has_chains() {
                diagonal_move_keeps_chains(grid, a, (dx, dy), site_a.chain_memberships())
            } else {
                diagonal_move_keeps_chains(grid, b, (-dx, -dy), site_b.chain_memberships())
            }
        }
        (true, false) => {
            let a_clear = (-1..=1).all(|k| {
                !grid.is_chain_neighbor_in_any(a.0 - dx, a.1 + k, site_a.chain_memberships())
            });
            let b_clear = (-1..=1).all(|k| {
                !grid.is_chain_neighbor_in_any(b.0 + dx, b.1 + k, site_b.chain_memberships())
            });
            a_clear && b_clear
        }
        (false, true) => {
            let a_clear = (-1..=1).all(|k| {
                !grid.is_chain_neighbor_in_any(a.0 + k, a.1 - dy, site_a.chain_memberships())
            });
            let b_clear = (-1..=1).all(|k| {
                !grid.is_chain_neighbor_in_any(b.0 + k, b.1 + dy, site_b.chain_memberships())
            });
            a_clear && b_clear
        }
        (false, false) => false,
    }
}

/// A diagonal move of the site at `origin` by `(dx, dy)` keeps a chain
/// connected when both orthogonal cells on the way are its chain neighbors,
/// or when the site ends its chain and one of them is.
fn diagonal_move_keeps_chains<'m, G, I>(grid: &G, origin: Position, (dx, dy): (i32, i32), memberships: I) -> bool
where
    G: SiteGrid + ?Sized,
    I: IntoIterator<Item = &'m ChainMembership>,
{
    memberships.into_iter().all(|membership| {
        let horizontal = grid.is_chain_neighbor(origin.0 + dx, origin.1, membership);
        let vertical = grid.is_chain_neighbor(origin.0, origin.1 + dy, membership);
        (horizontal && vertical) || (membership.is_last() && (horizontal || vertical))
    })
}
