use crate::catalog::CatalogEvent;
use crate::ids::EntityId;

/// Full-screen navigation over an ordered, filtered view.
///
/// Holds ids only, so a temporary id confirmed while the lightbox is open
/// must be rebound; [`Lightbox::apply`] does that from engine events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lightbox {
    ids: Vec<EntityId>,
    index: usize,
}

impl Lightbox {
    /// `None` when `start` is not part of `ids`.
    pub fn new(ids: Vec<EntityId>, start: &EntityId) -> Option<Self> {
        let index = ids.iter().position(|id| id == start)?;
        Some(Self { ids, index })
    }

    pub fn current(&self) -> &EntityId {
        &self.ids[self.index]
    }

    /// One-based position and total, for "3 / 12" style counters
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.ids.len())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> &EntityId {
        self.index = (self.index + 1) % self.ids.len();
        self.current()
    }

    pub fn prev(&mut self) -> &EntityId {
        self.index = (self.index + self.ids.len() - 1) % self.ids.len();
        self.current()
    }

    pub fn rebind(&mut self, temporary: &EntityId, confirmed: &EntityId) {
        for id in self.ids.iter_mut().filter(|id| **id == *temporary) {
            *id = confirmed.clone();
        }
    }

    /// Drop `id` from the sequence. Returns false once nothing is left to
    /// show; an empty lightbox must not be navigated.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        let Some(position) = self.ids.iter().position(|i| i == id) else {
            return !self.ids.is_empty();
        };
        self.ids.remove(position);
        if self.ids.is_empty() {
            self.index = 0;
            return false;
        }
        if position < self.index || self.index >= self.ids.len() {
            self.index = self.index.saturating_sub(1).min(self.ids.len() - 1);
        }
        true
    }

    /// Follow id replacements and removals. Returns false once empty.
    pub fn apply(&mut self, event: &CatalogEvent) -> bool {
        match event {
            CatalogEvent::Confirmed { temporary, confirmed } => {
                self.rebind(temporary, confirmed);
                true
            }
            CatalogEvent::Removed { id } | CatalogEvent::CreateFailed { temporary: id, .. } => {
                self.remove(id)
            }
            _ => !self.ids.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::from_string(*s)).collect()
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut lightbox = Lightbox::new(ids(&["a", "b", "c"]), &EntityId::from("c")).unwrap();
        assert_eq!(lightbox.position(), (3, 3));
        assert_eq!(lightbox.next().as_str(), "a");
        assert_eq!(lightbox.prev().as_str(), "c");
        assert_eq!(lightbox.prev().as_str(), "b");
    }

    #[test]
    fn test_unknown_start() {
        assert!(Lightbox::new(ids(&["a"]), &EntityId::from("z")).is_none());
    }

    #[test]
    fn test_confirmation_rebinds_current() {
        let temp = EntityId::from("tmp-1");
        let mut lightbox = Lightbox::new(vec![temp.clone(), EntityId::from("b")], &temp).unwrap();
        lightbox.apply(&CatalogEvent::Confirmed {
            temporary: temp,
            confirmed: EntityId::from("42"),
        });
        assert_eq!(lightbox.current().as_str(), "42");
    }

    #[test]
    fn test_removal_keeps_position_valid() {
        let mut lightbox = Lightbox::new(ids(&["a", "b", "c"]), &EntityId::from("c")).unwrap();
        assert!(lightbox.apply(&CatalogEvent::Removed { id: EntityId::from("c") }));
        assert_eq!(lightbox.current().as_str(), "b");
        assert!(lightbox.remove(&EntityId::from("a")));
        assert_eq!(lightbox.current().as_str(), "b");
        assert!(!lightbox.remove(&EntityId::from("b")));
    }
}
