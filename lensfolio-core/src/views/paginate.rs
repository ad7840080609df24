//! "Load more" pagination with optional demo filler

use crate::model::{CatalogItem, Entity, SyntheticEntity};

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// Zero-based page number
    pub number: usize,
    pub items: Vec<CatalogItem>,
    /// Whether another page follows
    pub has_more: bool,
}

/// Lazy, restartable page sequence over a snapshot, newest first.
///
/// With a synthetic cap the sequence continues past the real entities with
/// deterministic recombinations of them until `cap` items have been yielded
/// in total. An empty snapshot yields no pages either way.
#[derive(Clone, Debug)]
pub struct Paginator {
    entities: Vec<Entity>,
    page_size: usize,
    synthetic_cap: Option<usize>,
    cursor: usize,
}

impl Paginator {
    /// `page_size` must be positive; the engine validates it before building one.
    pub(crate) fn new(mut entities: Vec<Entity>, page_size: usize, synthetic_cap: Option<usize>) -> Self {
        entities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            entities,
            page_size: page_size.max(1),
            synthetic_cap,
            cursor: 0,
        }
    }

    /// Total number of items the sequence yields
    pub fn total(&self) -> usize {
        let real = self.entities.len();
        match self.synthetic_cap {
            Some(cap) if real > 0 => cap.max(real),
            _ => real,
        }
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.total()
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    fn item_at(&self, position: usize) -> CatalogItem {
        let real = self.entities.len();
        if position < real {
            CatalogItem::Persisted(self.entities[position].clone())
        } else {
            CatalogItem::Synthetic(SyntheticEntity::new(&self.entities[position % real], position))
        }
    }
}

impl Iterator for Paginator {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        let total = self.total();
        if self.cursor >= total {
            return None;
        }
        let start = self.cursor;
        let end = (start + self.page_size).min(total);
        let items = (start..end).map(|p| self.item_at(p)).collect();
        self.cursor = end;
        Some(Page {
            number: start / self.page_size,
            items,
            has_more: end < total,
        })
    }
}
