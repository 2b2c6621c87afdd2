//! Site record stored in every lattice cell.
//!
//! A site packs its chemical state (species + activity) and its flag state
//! (transcribability + transcription inhibition) into two bit fields, keeps
//! an RNA counter, and carries up to two chain memberships so that chain
//! topology can be queried locally without a separate chain object.

/// Identifier of a chain. `0` is reserved for "no chain".
pub type ChainId = u32;

/// Maximum number of chains a single site can belong to (a crossing point).
pub const MAX_CROSSING_CHAINS: usize = 2;

const SPECIES_BIT: u8 = 0;
const ACTIVE_BIT: u8 = 1;
const TRANSCRIBABLE_BIT: u8 = 0;
const INHIBITED_BIT: u8 = 1;

/// The two mutually exclusive species a site can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Species {
    Chromatin,
    Rbp,
}

/// Activity of a site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Activity {
    NotActive,
    Active,
}

/// Packed species/activity bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChemicalState(u8);

impl ChemicalState {
    pub fn new(species: Species, activity: Activity) -> Self {
        let mut bits = 0u8;
        set_bit(&mut bits, SPECIES_BIT, species == Species::Rbp);
        set_bit(&mut bits, ACTIVE_BIT, activity == Activity::Active);
        Self(bits)
    }

    pub fn inactive_chromatin() -> Self {
        Self::new(Species::Chromatin, Activity::NotActive)
    }

    pub fn active_chromatin() -> Self {
        Self::new(Species::Chromatin, Activity::Active)
    }

    pub fn inactive_rbp() -> Self {
        Self::new(Species::Rbp, Activity::NotActive)
    }

    pub fn active_rbp() -> Self {
        Self::new(Species::Rbp, Activity::Active)
    }

    #[inline]
    pub fn species(&self) -> Species {
        if get_bit(self.0, SPECIES_BIT) {
            Species::Rbp
        } else {
            Species::Chromatin
        }
    }

    #[inline]
    pub fn activity(&self) -> Activity {
        if get_bit(self.0, ACTIVE_BIT) {
            Activity::Active
        } else {
            Activity::NotActive
        }
    }

    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Packed transcribability/inhibition bits. Only meaningful for chromatin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(u8);

impl Flags {
    pub fn new(transcribable: bool, inhibited: bool) -> Self {
        let mut bits = 0u8;
        set_bit(&mut bits, TRANSCRIBABLE_BIT, transcribable);
        set_bit(&mut bits, INHIBITED_BIT, inhibited);
        Self(bits)
    }

    #[inline]
    pub fn is_transcribable(&self) -> bool {
        get_bit(self.0, TRANSCRIBABLE_BIT)
    }

    #[inline]
    pub fn is_transcription_inhibited(&self) -> bool {
        get_bit(self.0, INHIBITED_BIT)
    }

    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Membership of a site in one chain.
///
/// An empty slot has `length == 0`. A filled slot always satisfies
/// `chain_id != 0` and `position < length`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChainMembership {
    pub chain_id: ChainId,
    pub position: u32,
    pub length: u32,
}

impl ChainMembership {
    pub fn new(chain_id: ChainId, position: u32, length: u32) -> Self {
        Self {
            chain_id,
            position,
            length,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.position + 1 == self.length
    }

    /// True if `other` sits at an adjacent position of the same chain.
    #[inline]
    pub fn is_adjacent_to(&self, other: &ChainMembership) -> bool {
        !other.is_empty()
            && other.chain_id == self.chain_id
            && self.position.abs_diff(other.position) == 1
    }
}

/// Full record of one lattice cell.
///
/// Swaps move the whole record: species, flags, RNA and chain memberships
/// travel together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Site {
    chemical: ChemicalState,
    flags: Flags,
    rna_content: u32,
    chains: [ChainMembership; MAX_CROSSING_CHAINS],
}

impl Site {
    pub fn new(chemical: ChemicalState, flags: Flags) -> Self {
        Self {
            chemical,
            flags,
            ..Self::default()
        }
    }

    #[inline]
    pub fn chemical_state(&self) -> ChemicalState {
        self.chemical
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[inline]
    pub fn species(&self) -> Species {
        self.chemical.species()
    }

    #[inline]
    pub fn is_chromatin(&self) -> bool {
        self.species() == Species::Chromatin
    }

    #[inline]
    pub fn is_rbp(&self) -> bool {
        self.species() == Species::Rbp
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.chemical.activity() == Activity::Active
    }

    #[inline]
    pub fn is_active_chromatin(&self) -> bool {
        self.is_chromatin() && self.is_active()
    }

    #[inline]
    pub fn is_inactive_chromatin(&self) -> bool {
        self.is_chromatin() && !self.is_active()
    }

    #[inline]
    pub fn is_active_rbp(&self) -> bool {
        self.is_rbp() && self.is_active()
    }

    /// Active or carrying RNA: the "transcriptionally engaged" look of a site.
    #[inline]
    pub fn is_active_or_rna_bearing(&self) -> bool {
        self.is_active() || self.rna_content > 0
    }

    #[inline]
    pub fn is_transcribable(&self) -> bool {
        self.flags.is_transcribable()
    }

    #[inline]
    pub fn is_transcription_inhibited(&self) -> bool {
        self.flags.is_transcription_inhibited()
    }

    #[inline]
    pub fn rna_content(&self) -> u32 {
        self.rna_content
    }

    pub fn set_chemical_state(&mut self, chemical: ChemicalState) {
        self.chemical = chemical;
    }

    pub fn set_species(&mut self, species: Species) {
        self.chemical = ChemicalState::new(species, self.chemical.activity());
    }

    pub fn set_activity(&mut self, activity: Activity) {
        self.chemical = ChemicalState::new(self.chemical.species(), activity);
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn set_transcribable(&mut self, transcribable: bool) {
        self.flags = Flags::new(transcribable, self.flags.is_transcription_inhibited());
    }

    pub fn set_transcription_inhibited(&mut self, inhibited: bool) {
        self.flags = Flags::new(self.flags.is_transcribable(), inhibited);
    }

    pub fn set_rna_content(&mut self, rna_content: u32) {
        self.rna_content = rna_content;
    }

    #[inline]
    pub fn increment_rna(&mut self) {
        self.rna_content = self.rna_content.saturating_add(1);
    }

    /// Removes one RNA unit. Returns false (and leaves the counter at 0) if
    /// the site held none.
    #[inline]
    pub fn decrement_rna(&mut self) -> bool {
        if self.rna_content > 0 {
            self.rna_content -= 1;
            true
        } else {
            false
        }
    }

    /// Same chemical and flag state. RNA content and chains are ignored.
    #[inline]
    pub fn is_indistinguishable_from(&self, other: &Site) -> bool {
        self.chemical == other.chemical && self.flags == other.flags
    }

    /// Non-empty chain membership slots.
    pub fn chain_memberships(&self) -> impl Iterator<Item = &ChainMembership> + '_ {
        self.chains.iter().filter(|m| !m.is_empty())
    }

    #[inline]
    pub fn has_chains(&self) -> bool {
        self.chains.iter().any(|m| !m.is_empty())
    }

    /// Membership of this site in `chain_id`, if any.
    pub fn membership_in(&self, chain_id: ChainId) -> Option<&ChainMembership> {
        self.chain_memberships().find(|m| m.chain_id == chain_id)
    }

    pub fn belongs_to_any(&self, chain_ids: &std::collections::BTreeSet<ChainId>) -> bool {
        self.chain_memberships()
            .any(|m| chain_ids.contains(&m.chain_id))
    }

    /// Stores a membership in the first free slot, returning the slot index,
    /// or `None` when both slots are taken.
    pub fn push_chain(&mut self, membership: ChainMembership) -> Option<usize> {
        let slot = self.chains.iter().position(|m| m.is_empty())?;
        self.chains[slot] = membership;
        Some(slot)
    }
}

#[inline]
fn get_bit(bitfield: u8, bit: u8) -> bool {
    (bitfield >> bit) & 1 == 1
}

#[inline]
fn set_bit(bitfield: &mut u8, bit: u8, value: bool) {
    if value {
        *bitfield |= 1 << bit;
    } else {
        *bitfield &= !(1 << bit);
    }
}
