//! The closed set of incident categories and their display metadata.
//!
//! This table is the only place a category's label, glyph or colour is
//! defined. Submission writes the denormalised label and colour from here,
//! and display reads them back from here, so the two sides cannot drift.

use serde::{Deserialize, Serialize};

/// Display metadata attached to a [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMeta {
    pub code: &'static str,
    pub label: &'static str,
    pub emoji: &'static str,
    pub color_hex: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fire,
    Crime,
    Violence,
    Accident,
    Disaster,
    Medical,
    Other,
}

const FIRE: CategoryMeta = CategoryMeta {
    code: "fire",
    label: "Fire/Explosion",
    emoji: "🔥",
    color_hex: "#ef4444",
};
const CRIME: CategoryMeta = CategoryMeta {
    code: "crime",
    label: "Crime/Theft",
    emoji: "🚔",
    color_hex: "#f59e0b",
};
const VIOLENCE: CategoryMeta = CategoryMeta {
    code: "violence",
    label: "Violence/Unrest",
    emoji: "⚠️",
    color_hex: "#ea580c",
};
const ACCIDENT: CategoryMeta = CategoryMeta {
    code: "accident",
    label: "Road Accident",
    emoji: "🚗",
    color_hex: "#2563eb",
};
const DISASTER: CategoryMeta = CategoryMeta {
    code: "disaster",
    label: "Natural Disaster",
    emoji: "🌊",
    color_hex: "#7c3aed",
};
const MEDICAL: CategoryMeta = CategoryMeta {
    code: "medical",
    label: "Medical Emergency",
    emoji: "🏥",
    color_hex: "#16a34a",
};
const OTHER: CategoryMeta = CategoryMeta {
    code: "other",
    label: "Other",
    emoji: "❓",
    color_hex: "#6b7280",
};

impl Category {
    /// Every category, in the order they are offered to a reporter.
    pub const ALL: [Category; 7] = [
        Category::Fire,
        Category::Crime,
        Category::Violence,
        Category::Accident,
        Category::Disaster,
        Category::Medical,
        Category::Other,
    ];

    pub fn meta(self) -> &'static CategoryMeta {
        match self {
            Category::Fire => &FIRE,
            Category::Crime => &CRIME,
            Category::Violence => &VIOLENCE,
            Category::Accident => &ACCIDENT,
            Category::Disaster => &DISASTER,
            Category::Medical => &MEDICAL,
            Category::Other => &OTHER,
        }
    }

    pub fn code(self) -> &'static str {
        self.meta().code
    }

    pub fn label(self) -> &'static str {
        self.meta().label
    }

    pub fn emoji(self) -> &'static str {
        self.meta().emoji
    }

    pub fn color_hex(self) -> &'static str {
        self.meta().color_hex
    }

    /// Label shown in pickers, e.g. `"🔥 Fire/Explosion"`.
    pub fn option_label(self) -> String {
        format!("{} {}", self.emoji(), self.label())
    }

    /// Strict lookup: `None` for codes outside the closed set.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }

    /// Lenient lookup for records read back from the remote store.
    /// Unknown or legacy codes display as [`Category::Other`].
    pub fn from_code_or_other(code: Option<&str>) -> Self {
        code.and_then(Self::from_code).unwrap_or(Category::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown category code: {s}"))
    }
}

/// Category selector used by the list and map views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => c == category,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(c: Category) -> Self {
        CategoryFilter::Only(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_code(c.code()), Some(c));
            assert_eq!(c.code().parse::<Category>().unwrap(), c);
        }
        let codes: std::collections::HashSet<_> = Category::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), Category::ALL.len());
    }

    #[test]
    fn unknown_codes_fall_back_to_other() {
        assert_eq!(Category::from_code("flood"), None);
        assert_eq!(Category::from_code_or_other(Some("flood")), Category::Other);
        assert_eq!(Category::from_code_or_other(None), Category::Other);
        assert_eq!(Category::from_code_or_other(Some(" FIRE ")), Category::Fire);
    }

    #[test]
    fn option_label_joins_glyph_and_label() {
        assert_eq!(Category::Fire.option_label(), "🔥 Fire/Explosion");
        assert_eq!(Category::Other.option_label(), "❓ Other");
    }

    #[test]
    fn serde_uses_lowercase_codes() {
        let json = serde_json::to_string(&Category::Medical).unwrap();
        assert_eq!(json, "\"medical\"");
        let back: Category = serde_json::from_str("\"accident\"").unwrap();
        assert_eq!(back, Category::Accident);
    }

    #[test]
    fn filter_all_matches_everything() {
        for c in Category::ALL {
            assert!(CategoryFilter::All.matches(c));
        }
        assert!(CategoryFilter::Only(Category::Crime).matches(Category::Crime));
        assert!(!CategoryFilter::Only(Category::Crime).matches(Category::Fire));
    }
}
