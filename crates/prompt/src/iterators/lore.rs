use serene_core::{ChatSnapshot, LoreEntry, MAX_PRIORITY, Visibility};

use super::{PrioritySource, TierCursor};

#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    constant: bool,
    tier: u8,
    position: i32,
}

/// Yields lore entry indices by tier.
///
/// Tier 4 is every constant entry in source order. Tiers 3..=0 yield the
/// non-constant entries whose priority equals the tier, ordered by
/// `position` (stable for ties). Non-constant priority 4 is treated as 3.
#[derive(Debug, Clone, Default)]
pub struct LoreIterator {
    slots: Vec<Slot>,
}

impl LoreIterator {
    /// Iterate every enabled entry for which `eligible` holds.
    pub fn new(entries: &[LoreEntry], eligible: impl Fn(&LoreEntry) -> bool) -> Self {
        let slots = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.enabled && eligible(e))
            .map(|(index, e)| Slot {
                index,
                constant: e.constant,
                tier: e.priority.min(MAX_PRIORITY - 1),
                position: e.position,
            })
            .collect();
        Self { slots }
    }

    /// World lore: every enabled entry applies.
    pub fn world_lore(chat: &ChatSnapshot) -> Self {
        match &chat.lorebook {
            Some(book) => Self::new(&book.world_lore, |_| true),
            None => Self::default(),
        }
    }

    /// Character lore: the entry's binding must resolve to a persona or a
    /// character present in the chat. Characters that are hidden or minimal
    /// contribute nothing unless they are the current speaker.
    pub fn character_lore(chat: &ChatSnapshot, current_character_id: i64) -> Self {
        let Some(book) = &chat.lorebook else {
            return Self::default();
        };
        Self::new(&book.character_lore, |entry| {
            let Some(binding) = entry
                .lorebook_binding_id
                .and_then(|id| book.bindings.iter().find(|b| b.id == id))
            else {
                return false;
            };
            if let Some(character_id) = binding.character_id {
                if chat.chat_character(character_id).is_none() {
                    return false;
                }
                return character_id == current_character_id
                    || chat.visibility_of(character_id) == Visibility::Visible;
            }
            binding
                .persona_id
                .is_some_and(|persona_id| chat.persona(persona_id).is_some())
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl PrioritySource for LoreIterator {
    fn tier(&self, priority: u8) -> TierCursor {
        if priority >= MAX_PRIORITY {
            return TierCursor::new(
                self.slots
                    .iter()
                    .filter(|s| s.constant)
                    .map(|s| s.index)
                    .collect(),
            );
        }
        let mut slots: Vec<Slot> = self
            .slots
            .iter()
            .filter(|s| !s.constant && s.tier == priority)
            .copied()
            .collect();
        slots.sort_by_key(|s| s.position);
        TierCursor::new(slots.into_iter().map(|s| s.index).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serene_core::{
        Character, ChatCharacter, ChatPersona, LorebookBinding, Lorebook, Persona,
    };

    fn entries() -> Vec<LoreEntry> {
        vec![
            LoreEntry::new(1, "a", "A").with_priority(2).with_position(5),
            LoreEntry::new(2, "b", "B").constant(),
            LoreEntry::new(3, "c", "C").with_priority(2).with_position(1),
            LoreEntry::new(4, "d", "D").with_priority(3),
            LoreEntry::new(5, "e", "E").with_priority(2).with_position(1),
            LoreEntry::new(6, "f", "F").with_priority(4),
            LoreEntry::new(7, "g", "G").with_priority(0),
        ]
    }

    #[test]
    fn constants_come_first() {
        let it = LoreIterator::new(&entries(), |_| true);
        assert_eq!(it.tier(4).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn tier_sorted_by_position_stably() {
        let it = LoreIterator::new(&entries(), |_| true);
        // ids 3 and 5 share position 1; source order breaks the tie
        assert_eq!(it.tier(2).collect::<Vec<_>>(), vec![2, 4, 0]);
    }

    #[test]
    fn high_priority_non_constant_lands_in_tier_three() {
        let it = LoreIterator::new(&entries(), |_| true);
        assert_eq!(it.tier(3).collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(it.tier(0).collect::<Vec<_>>(), vec![6]);
        assert!(it.tier(1).is_exhausted());
    }

    #[test]
    fn disabled_entries_never_yield() {
        let mut list = entries();
        list[1].enabled = false;
        let it = LoreIterator::new(&list, |_| true);
        assert!(it.tier(4).is_exhausted());
        assert_eq!(it.len(), 6);
    }

    fn group_chat() -> ChatSnapshot {
        ChatSnapshot {
            id: 1,
            characters: vec![
                ChatCharacter::visible(Character::new(10, "Aria")),
                ChatCharacter::with_visibility(Character::new(11, "Bram"), Visibility::Hidden),
                ChatCharacter::with_visibility(Character::new(12, "Cass"), Visibility::Minimal),
            ],
            personas: vec![ChatPersona {
                persona: Persona::new(20, "Sam"),
            }],
            lorebook: Some(Lorebook {
                character_lore: vec![
                    LoreEntry::new(1, "", "Aria lore").bound_to(100),
                    LoreEntry::new(2, "", "Bram lore").bound_to(101),
                    LoreEntry::new(3, "", "Cass lore").bound_to(102),
                    LoreEntry::new(4, "", "Sam lore").bound_to(103),
                    LoreEntry::new(5, "", "Ghost lore").bound_to(104),
                    LoreEntry::new(6, "", "Unbound lore"),
                ],
                bindings: vec![
                    binding(100, 1, Some(10), None),
                    binding(101, 2, Some(11), None),
                    binding(102, 3, Some(12), None),
                    binding(103, 4, None, Some(20)),
                    binding(104, 5, Some(99), None),
                ],
                ..Lorebook::default()
            }),
            ..ChatSnapshot::default()
        }
    }

    fn binding(id: i64, n: u32, character: Option<i64>, persona: Option<i64>) -> LorebookBinding {
        LorebookBinding {
            id,
            binding: n,
            character_id: character,
            persona_id: persona,
        }
    }

    #[test]
    fn character_lore_respects_visibility_and_presence() {
        let it = LoreIterator::character_lore(&group_chat(), 10);
        assert_eq!(it.tier(2).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn current_speaker_lore_is_always_eligible() {
        let it = LoreIterator::character_lore(&group_chat(), 11);
        assert_eq!(it.tier(2).collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn no_lorebook_yields_nothing() {
        let chat = ChatSnapshot::default();
        assert!(LoreIterator::world_lore(&chat).is_empty());
        assert!(LoreIterator::character_lore(&chat, 1).is_empty());
    }
}
