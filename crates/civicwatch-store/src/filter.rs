//! Visible-subset derivation for the list and map views.

use serde::{Deserialize, Serialize};

use civicwatch_shared::{CategoryFilter, Incident};

/// Current filter inputs, as chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub category: CategoryFilter,
    pub search: String,
}

impl ViewQuery {
    pub fn new(category: CategoryFilter, search: impl Into<String>) -> Self {
        Self {
            category,
            search: search.into(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.category == CategoryFilter::All && self.search.trim().is_empty()
    }

    pub fn apply(&self, replica: &[Incident]) -> Vec<Incident> {
        apply(replica, self.category, &self.search)
    }
}

/// Incidents of `replica` matching the category filter and the search term,
/// in replica order. The term is trimmed and matched case-insensitively as a
/// substring of the description, the location label or the category label.
pub fn apply(replica: &[Incident], category: CategoryFilter, search: &str) -> Vec<Incident> {
    let term = search.trim().to_lowercase();
    replica
        .iter()
        .filter(|incident| category.matches(incident.category))
        .filter(|incident| term.is_empty() || matches_term(incident, &term))
        .cloned()
        .collect()
}

fn matches_term(incident: &Incident, term: &str) -> bool {
    [
        incident.description.as_str(),
        incident.location_label.as_str(),
        incident.category_label(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civicwatch_shared::{Category, Coordinates, IncidentId};

    fn incident(id: &str, category: Category, description: &str, location: &str) -> Incident {
        Incident {
            id: IncidentId::from(id),
            category,
            description: description.into(),
            location_label: location.into(),
            coordinates: Some(Coordinates::new(6.5, 3.4)),
            created_at: None,
        }
    }

    fn replica() -> Vec<Incident> {
        vec![
            incident("1", Category::Fire, "Warehouse blaze", "Apapa Wharf"),
            incident("2", Category::Crime, "Phone snatched", "Ikeja Along"),
            incident("3", Category::Fire, "Generator explosion", "Yaba"),
            incident("4", Category::Medical, "Man collapsed", "Ikeja GRA"),
        ]
    }

    fn ids(subset: &[Incident]) -> Vec<&str> {
        subset.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn all_and_empty_term_is_identity() {
        let r = replica();
        assert_eq!(apply(&r, CategoryFilter::All, ""), r);
        assert_eq!(apply(&r, CategoryFilter::All, "   "), r);
        assert!(ViewQuery::default().is_identity());
    }

    #[test]
    fn category_filter_preserves_order() {
        let r = replica();
        let fires = apply(&r, Category::Fire.into(), "");
        assert_eq!(ids(&fires), ["1", "3"]);
        assert!(apply(&r, Category::Disaster.into(), "").is_empty());
    }

    #[test]
    fn term_matches_description_location_or_category_label() {
        let r = replica();
        assert_eq!(ids(&apply(&r, CategoryFilter::All, "BLAZE")), ["1"]);
        assert_eq!(ids(&apply(&r, CategoryFilter::All, "ikeja")), ["2", "4"]);
        // "Medical Emergency" is the category label of #4.
        assert_eq!(ids(&apply(&r, CategoryFilter::All, "emergency")), ["4"]);
        assert_eq!(ids(&apply(&r, CategoryFilter::All, " explosion ")), ["1", "3"]);
        assert!(apply(&r, CategoryFilter::All, "flood").is_empty());
    }

    #[test]
    fn category_and_term_combine() {
        let r = replica();
        let q = ViewQuery::new(Category::Crime.into(), "ikeja");
        assert_eq!(ids(&q.apply(&r)), ["2"]);
    }

    #[test]
    fn inputs_are_not_mutated_and_output_is_deterministic() {
        let r = replica();
        let before = r.clone();
        let a = apply(&r, CategoryFilter::All, "i");
        let b = apply(&r, CategoryFilter::All, "i");
        assert_eq!(a, b);
        assert_eq!(r, before);
    }
}
