use serde::Serialize;

use crate::model::config::PagingConfig;
use crate::model::task::Task;
use crate::model::view::{SortOrder, ViewControls};
use crate::ops::search::{TitleQuery, matches_status};

/// Where the visible slice sits among all pages of the filtered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    /// Whether the current page has been revealed past the initial peek
    pub expanded: bool,
    pub has_previous: bool,
    pub has_next: bool,
    /// Offer "load more": the page is still collapsed and the filtered
    /// list is longer than the peek.
    pub load_more_available: bool,
}

/// The derived, ordered, paged subset of a task set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView<'a> {
    pub visible: Vec<&'a Task>,
    /// Number of tasks passing search and status, before paging
    pub total_matching: usize,
    pub page: PageInfo,
}

/// Counts over the whole (unfiltered) task set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// `ceil(total_matching / page_size)`, never less than 1
pub fn total_pages(total_matching: usize, page_size: usize) -> usize {
    total_matching.div_ceil(page_size.max(1)).max(1)
}

/// Derive what the user sees from a task set and the view controls.
///
/// Steps run in a fixed order: search, status filter, stable sort on
/// `created_at`, then paging. A page that has not been expanded is cut
/// down to the first `initial_display_count` entries.
///
/// The current page is not clamped here; a page past the end yields an
/// empty slice. Keeping it in range is the caller's job.
pub fn derive<'a>(tasks: &'a [Task], controls: &ViewControls, paging: PagingConfig) -> TaskView<'a> {
    let paging = paging.normalized();
    let query = TitleQuery::new(&controls.search_query);

    let mut matching: Vec<&'a Task> = tasks
        .iter()
        .filter(|t| query.matches(t))
        .filter(|t| matches_status(t, controls.status_filter))
        .collect();
    sort_by_created(&mut matching, controls.sort_order);

    let total_matching = matching.len();
    let pages = total_pages(total_matching, paging.items_per_page);
    let current = controls.current_page.max(1);
    let expanded = controls.is_expanded(current);

    let start = (current - 1).saturating_mul(paging.items_per_page);
    let mut visible = if start < total_matching {
        let end = start
            .saturating_add(paging.items_per_page)
            .min(total_matching);
        matching[start..end].to_vec()
    } else {
        Vec::new()
    };
    if !expanded {
        visible.truncate(paging.initial_display_count);
    }

    TaskView {
        visible,
        total_matching,
        page: PageInfo {
            current_page: current,
            total_pages: pages,
            page_size: paging.items_per_page,
            expanded,
            has_previous: current > 1,
            has_next: current < pages,
            load_more_available: !expanded && total_matching > paging.initial_display_count,
        },
    }
}

/// Stable sort on creation time; equal timestamps keep their input order.
fn sort_by_created(tasks: &mut [&Task], order: SortOrder) {
    match order {
        SortOrder::Ascending => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::Descending => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|t| t.is_complete).count();
    TaskStats {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
