//! Chain queries over the per-site membership records.
//!
//! Chains are never stored as objects. Membership slots scattered across
//! sites are enough to answer the local questions the swap engine asks
//! ("is this cell my neighbor in chain X?"), and the whole chain can be
//! rebuilt on demand for auditing.

use std::collections::{BTreeMap, BTreeSet};

use super::grid::{Lattice, Position, SiteGrid};
use super::site::{ChainId, ChainMembership};

/// Chain-aware queries available on every [`SiteGrid`].
pub trait ChainIndex: SiteGrid {
    /// True if the site at `(column, row)` holds the position adjacent to
    /// `membership` in the same chain.
    fn is_chain_neighbor(&self, column: i32, row: i32, membership: &ChainMembership) -> bool {
        self.site(column, row)
            .chain_memberships()
            .any(|other| membership.is_adjacent_to(other))
    }

    /// True if the site at `(column, row)` is a chain neighbor through any
    /// of the given memberships.
    fn is_chain_neighbor_in_any<'m, I>(&self, column: i32, row: i32, memberships: I) -> bool
    where
        I: IntoIterator<Item = &'m ChainMembership>,
    {
        memberships
            .into_iter()
            .any(|membership| self.is_chain_neighbor(column, row, membership))
    }
}

impl<G: SiteGrid + ?Sized> ChainIndex for G {}

/// Ordered sites of one chain: `(position, coordinate)` sorted by position.
pub type ChainLayout = Vec<(u32, Position)>;

impl Lattice {
    /// Identifiers of every chain present on the lattice.
    pub fn chain_ids(&self) -> BTreeSet<ChainId> {
        self.positions()
            .flat_map(|(column, row)| {
                self.site(column, row)
                    .chain_memberships()
                    .map(|m| m.chain_id)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Rebuild every chain from the membership slots.
    pub fn chain_layout(&self) -> BTreeMap<ChainId, ChainLayout> {
        let mut chains: BTreeMap<ChainId, ChainLayout> = BTreeMap::new();
        for (column, row) in self.positions() {
            for membership in self.site(column, row).chain_memberships() {
                chains
                    .entry(membership.chain_id)
                    .or_default()
                    .push((membership.position, (column, row)));
            }
        }
        for layout in chains.values_mut() {
            layout.sort_unstable();
        }
        chains
    }

    /// Consecutive chain positions that are not 8-connected.
    ///
    /// Each entry is `(chain_id, position)` naming the link between
    /// `position` and `position + 1`. Empty for a well-formed lattice.
    pub fn broken_chain_links(&self) -> Vec<(ChainId, u32)> {
        let mut broken = Vec::new();
        for (chain_id, layout) in self.chain_layout() {
            for pair in layout.windows(2) {
                let (position, (column, row)) = pair[0];
                let (next_position, (next_column, next_row)) = pair[1];
                let connected = next_position == position + 1
                    && (column - next_column).abs() <= 1
                    && (row - next_row).abs() <= 1;
                if !connected {
                    broken.push((chain_id, position));
                }
            }
        }
        broken
    }

    /// Sites belonging to any of the given chains.
    pub fn sites_in_chains(&self, chain_ids: &BTreeSet<ChainId>) -> Vec<Position> {
        self.positions()
            .filter(|&(column, row)| self.site(column, row).belongs_to_any(chain_ids))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice_with_row_chain() -> Lattice {
        let mut lattice = Lattice::new(6, 4).unwrap();
        let chain_id = lattice.new_chain_id();
        for column in 1..=5 {
            lattice
                .set_chain_membership(column, 2, chain_id, (column - 1) as u32, 5)
                .unwrap();
        }
        lattice
    }

    #[test]
    fn test_chain_neighbor_lookup() {
        let lattice = lattice_with_row_chain();
        let membership = *lattice.get(3, 2).membership_in(1).unwrap();
        assert!(lattice.is_chain_neighbor(2, 2, &membership));
        assert!(lattice.is_chain_neighbor(4, 2, &membership));
        assert!(!lattice.is_chain_neighbor(5, 2, &membership));
        assert!(!lattice.is_chain_neighbor(3, 3, &membership));
        assert!(!lattice.is_chain_neighbor(3, 2, &membership));
    }

    #[test]
    fn test_chain_neighbor_in_any_crossing() {
        let mut lattice = lattice_with_row_chain();
        let vertical = lattice.new_chain_id();
        for row in 1..=3 {
            lattice
                .set_chain_membership(3, row, vertical, (row - 1) as u32, 3)
                .unwrap();
        }
        let crossing: Vec<ChainMembership> =
            lattice.get(3, 2).chain_memberships().copied().collect();
        assert_eq!(crossing.len(), 2);
        assert!(lattice.is_chain_neighbor_in_any(3, 1, &crossing));
        assert!(lattice.is_chain_neighbor_in_any(2, 2, &crossing));
        assert!(!lattice.is_chain_neighbor_in_any(2, 1, &crossing));
    }

    #[test]
    fn test_layout_and_audit() {
        let mut lattice = lattice_with_row_chain();
        let layout = lattice.chain_layout();
        assert_eq!(layout[&1].len(), 5);
        assert_eq!(layout[&1][0], (0, (1, 2)));
        assert!(lattice.broken_chain_links().is_empty());

        // Move the chain end far away by hand: the audit must notice
        let end = *lattice.get(5, 2);
        let empty = *lattice.get(1, 4);
        lattice.set(1, 4, end);
        lattice.set(5, 2, empty);
        assert_eq!(lattice.broken_chain_links(), vec![(1, 3)]);
    }

    #[test]
    fn test_sites_in_chains() {
        let lattice = lattice_with_row_chain();
        let ids: BTreeSet<ChainId> = [1].into_iter().collect();
        assert_eq!(lattice.sites_in_chains(&ids).len(), 5);
        assert_eq!(lattice.chain_ids(), ids);
        let other: BTreeSet<ChainId> = [9].into_iter().collect();
        assert!(lattice.sites_in_chains(&other).is_empty());
    }
}
