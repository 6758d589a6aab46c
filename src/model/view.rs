use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Completion filter applied after the search predicate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Completed => "completed",
            StatusFilter::Pending => "pending",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(format!(
                "invalid status '{}' (expected all, completed or pending)",
                other
            )),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering over `created_at`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first
    #[serde(rename = "asc")]
    Ascending,
    /// Newest first
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascending" | "oldest" => Ok(SortOrder::Ascending),
            "desc" | "descending" | "newest" => Ok(SortOrder::Descending),
            other => Err(format!("invalid sort order '{}' (expected asc or desc)", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient, user-supplied view state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewControls {
    pub search_query: String,
    pub status_filter: StatusFilter,
    pub sort_order: SortOrder,
    /// 1-based page number
    pub current_page: usize,
    /// Pages that have been revealed past the initial peek
    pub expanded_pages: BTreeSet<usize>,
}

impl Default for ViewControls {
    fn default() -> Self {
        ViewControls {
            search_query: String::new(),
            status_filter: StatusFilter::All,
            sort_order: SortOrder::Descending,
            current_page: 1,
            expanded_pages: BTreeSet::new(),
        }
    }
}

impl ViewControls {
    pub fn is_expanded(&self, page: usize) -> bool {
        self.expanded_pages.contains(&page)
    }
}
