use crate::model::{Entity, FieldPatch, ReactionKind, Reactions};

/// The viewer's reaction to one entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReactionState {
    #[default]
    NoReaction,
    Reacted(ReactionKind),
}

impl From<Option<ReactionKind>> for ReactionState {
    fn from(reaction: Option<ReactionKind>) -> Self {
        match reaction {
            Some(kind) => ReactionState::Reacted(kind),
            None => ReactionState::NoReaction,
        }
    }
}

impl ReactionState {
    pub fn kind(&self) -> Option<ReactionKind> {
        match self {
            ReactionState::NoReaction => None,
            ReactionState::Reacted(kind) => Some(*kind),
        }
    }

    /// Toggle `kind`, moving the counters along.
    ///
    /// Reacting with the current kind withdraws it; reacting with another
    /// kind switches. Counters never go below zero.
    pub fn toggle(self, kind: ReactionKind, counters: &mut Reactions) -> ReactionState {
        match self {
            ReactionState::NoReaction => {
                *counters.get_mut(kind) += 1;
                ReactionState::Reacted(kind)
            }
            ReactionState::Reacted(current) if current == kind => {
                decrement(counters, kind);
                ReactionState::NoReaction
            }
            ReactionState::Reacted(current) => {
                decrement(counters, current);
                *counters.get_mut(kind) += 1;
                ReactionState::Reacted(kind)
            }
        }
    }
}

fn decrement(counters: &mut Reactions, kind: ReactionKind) {
    let count = counters.get_mut(kind);
    *count = count.saturating_sub(1);
}

/// Patch toggling `kind` on `entity`.
pub fn reaction_patch(entity: &Entity, kind: ReactionKind) -> FieldPatch {
    let mut reactions = entity.reactions;
    let state = ReactionState::from(entity.user_reaction).toggle(kind, &mut reactions);
    FieldPatch {
        reactions: Some(reactions),
        user_reaction: Some(state.kind()),
        ..FieldPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_toggle_is_identity() {
        for kind in ReactionKind::ALL {
            let mut counters = Reactions {
                heart: 2,
                love: 0,
                fire: 5,
                clap: 1,
            };
            let before = counters;
            let state = ReactionState::NoReaction
                .toggle(kind, &mut counters)
                .toggle(kind, &mut counters);
            assert_eq!(state, ReactionState::NoReaction);
            assert_eq!(counters, before);
        }
    }

    #[test]
    fn test_switch_moves_the_count() {
        let mut counters = Reactions::default();
        let state = ReactionState::NoReaction.toggle(ReactionKind::Heart, &mut counters);
        let state = state.toggle(ReactionKind::Fire, &mut counters);
        assert_eq!(state, ReactionState::Reacted(ReactionKind::Fire));
        assert_eq!(counters.heart, 0);
        assert_eq!(counters.fire, 1);

        // A -> B -> B-off returns to the baseline
        let state = state.toggle(ReactionKind::Fire, &mut counters);
        assert_eq!(state, ReactionState::NoReaction);
        assert_eq!(counters, Reactions::default());
    }

    #[test]
    fn test_counters_floor_at_zero() {
        // Viewer flag says reacted but the shared counter was already reset
        let mut counters = Reactions::default();
        let state = ReactionState::Reacted(ReactionKind::Clap).toggle(ReactionKind::Clap, &mut counters);
        assert_eq!(state, ReactionState::NoReaction);
        assert_eq!(counters.clap, 0);

        let state = ReactionState::Reacted(ReactionKind::Love).toggle(ReactionKind::Heart, &mut counters);
        assert_eq!(state, ReactionState::Reacted(ReactionKind::Heart));
        assert_eq!(counters.love, 0);
        assert_eq!(counters.heart, 1);
    }
}
