use crate::model::{Category, Entity};

/// Category, tag and free-text selection over a catalog snapshot.
///
/// Every selected tag must be present on an entity. The query matches a
/// case-insensitive substring of the title, description or any tag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewFilter {
    pub category: Option<Category>,
    pub tags: Vec<String>,
    pub query: String,
}

impl ViewFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(category) = &self.category {
            if entity.category != *category {
                return false;
            }
        }
        if !self.tags.iter().all(|t| entity.tags.contains(t)) {
            return false;
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        entity.title.to_lowercase().contains(&query)
            || entity.description.to_lowercase().contains(&query)
            || entity.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Entities passing `filter`, in their original order.
pub fn filter_entities(entities: &[Entity], filter: &ViewFilter) -> Vec<Entity> {
    entities
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect()
}

/// Distinct tags in first-seen order.
pub fn all_tags(entities: &[Entity]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in entities.iter().flat_map(|e| e.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;
    use crate::model::{EntityDraft, MediaRef, PhotoCategory};
    use chrono::Utc;

    fn photo(id: &str, title: &str, category: PhotoCategory, tags: &[&str]) -> Entity {
        Entity::from_draft(
            EntityId::from_string(id),
            &EntityDraft::photo(title, Category::Photo(category))
                .with_description("Taken at dawn")
                .with_tags(tags.iter().copied()),
            MediaRef::external(format!("https://cdn.example.com/{id}.jpg")),
            None,
            Utc::now(),
        )
    }

    fn sample() -> Vec<Entity> {
        vec![
            photo("1", "Alhambra at dusk", PhotoCategory::Urban, &["granada", "Night"]),
            photo("2", "Eagle", PhotoCategory::Wildlife, &["birds"]),
            photo("3", "Procession", PhotoCategory::HolyWeek, &["granada", "faith"]),
        ]
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let all = sample();
        assert_eq!(filter_entities(&all, &ViewFilter::all()), all);
    }

    #[test]
    fn test_category_and_tags_combine() {
        let all = sample();
        let filter = ViewFilter::all()
            .category(Category::Photo(PhotoCategory::Urban))
            .tag("granada");
        assert_eq!(ids(&filter_entities(&all, &filter)), vec!["1"]);

        let both_tags = ViewFilter::all().tag("granada").tag("faith");
        assert_eq!(ids(&filter_entities(&all, &both_tags)), vec!["3"]);
    }

    #[test]
    fn test_query_is_trimmed_and_case_insensitive() {
        let all = sample();
        assert_eq!(
            ids(&filter_entities(&all, &ViewFilter::all().query("  EAGLE "))),
            vec!["2"]
        );
        // Matches tags and descriptions too
        assert_eq!(
            ids(&filter_entities(&all, &ViewFilter::all().query("night"))),
            vec!["1"]
        );
        assert_eq!(filter_entities(&all, &ViewFilter::all().query("dawn")).len(), 3);
    }

    #[test]
    fn test_filter_is_pure() {
        let all = sample();
        let before = all.clone();
        let filter = ViewFilter::all().tag("granada").query("procession");
        let first = filter_entities(&all, &filter);
        let second = filter_entities(&all, &filter);
        assert_eq!(first, second);
        assert_eq!(all, before);
    }

    #[test]
    fn test_all_tags_first_seen_order() {
        assert_eq!(
            all_tags(&sample()),
            vec!["granada", "Night", "birds", "faith"]
        );
    }
}
