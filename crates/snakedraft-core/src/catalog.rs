// Catalog store: the immutable pool of draftable items, grouped by category.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Draftable categories, in the fixed order used for board navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

/// Fixed category ordering. The first entry is the default board category.
pub const CATEGORY_ORDER: &[Category] = &[
    Category::Quarterback,
    Category::RunningBack,
    Category::WideReceiver,
    Category::TightEnd,
    Category::Kicker,
    Category::Defense,
];

impl Category {
    /// Parse a roster position abbreviation into a category.
    ///
    /// Offensive linemen, punters and long snappers have no category and
    /// return `None`; every defensive position collapses into `Defense`.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Category::Quarterback),
            "RB" | "FB" => Some(Category::RunningBack),
            "WR" => Some(Category::WideReceiver),
            "TE" => Some(Category::TightEnd),
            "K" | "PK" => Some(Category::Kicker),
            "DE" | "DT" | "NT" | "DL" | "LB" | "ILB" | "OLB" | "MLB" | "CB" | "S" | "SS"
            | "FS" | "DB" | "DEF" | "D/ST" => Some(Category::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Category::Quarterback => "QB",
            Category::RunningBack => "RB",
            Category::WideReceiver => "WR",
            Category::TightEnd => "TE",
            Category::Kicker => "K",
            Category::Defense => "DEF",
        }
    }

    /// The category boards open on.
    pub fn default_board() -> Self {
        CATEGORY_ORDER[0]
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::default_board()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Case-insensitive `(name, group)` identity used for duplicate detection.
///
/// Two items are the same draftable item when their name and group match
/// ignoring case, whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn new(name: &str, group_label: &str) -> Self {
        ItemKey(format!(
            "{}|{}",
            name.trim().to_lowercase(),
            group_label.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single draftable item as delivered by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Short display name (e.g. "Tom Brady").
    pub display_name: String,
    /// Full legal name; often equal to `display_name`.
    pub full_name: String,
    /// Jersey number or other short label.
    pub jersey: String,
    pub category: Category,
    /// Headshot URL or other image reference; may be empty.
    pub image_ref: String,
    /// Long group name (e.g. "Detroit Lions").
    pub group_name: String,
    /// Short group label (e.g. "DET").
    pub group_label: String,
}

impl CandidateItem {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.display_name, &self.group_label)
    }
}

/// Immutable catalog for one draft session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_category: HashMap<Category, Vec<CandidateItem>>,
    len: usize,
}

impl Catalog {
    /// Build a catalog, grouping items by category while keeping load order
    /// within each category.
    pub fn new(items: Vec<CandidateItem>) -> Self {
        let len = items.len();
        let mut by_category: HashMap<Category, Vec<CandidateItem>> = HashMap::new();
        for item in items {
            by_category.entry(item.category).or_default().push(item);
        }
        Catalog { by_category, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All items of a category, in load order.
    pub fn items(&self, category: Category) -> &[CandidateItem] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The first `limit` items of `category` not in `excluded`, in load order.
    ///
    /// Returns an empty list when nothing qualifies; callers present that as
    /// "no items available, choose another category".
    pub fn top_available(
        &self,
        category: Category,
        excluded: &HashSet<ItemKey>,
        limit: usize,
    ) -> Vec<CandidateItem> {
        self.items(category)
            .iter()
            .filter(|item| !excluded.contains(&item.key()))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Look up an item by display name or full name plus group label,
    /// ignoring case.
    pub fn find(&self, name: &str, group_label: &str) -> Option<&CandidateItem> {
        let name = name.trim();
        let group_label = group_label.trim();
        CATEGORY_ORDER
            .iter()
            .flat_map(|c| self.items(*c))
            .find(|item| {
                item.group_label.eq_ignore_ascii_case(group_label)
                    && (item.display_name.to_lowercase() == name.to_lowercase()
                        || item.full_name.to_lowercase() == name.to_lowercase())
            })
    }
}
