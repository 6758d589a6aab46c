use serde::Serialize;

use crate::controller::CollectionStatus;
use crate::model::task::Task;
use crate::model::view::ViewControls;
use crate::ops::view::{PageInfo, TaskStats, TaskView};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ViewJson<'a> {
    pub status: CollectionStatus,
    pub tasks: &'a [&'a Task],
    pub total_matching: usize,
    pub page: PageInfo,
    pub controls: &'a ViewControls,
    pub stats: TaskStats,
}

#[derive(Serialize)]
pub struct DeletedJson<'a> {
    pub deleted: &'a str,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(task: &Task) -> char {
    if task.is_complete { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task) -> String {
    format!(
        "[{}] {}  {}  ({})",
        check_char(task),
        task.id,
        task.title,
        task.created_at.format("%Y-%m-%d")
    )
}

/// Format the visible slice with a header and paging hints
pub fn format_view(view: &TaskView<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let page = &view.page;

    if view.total_matching == 0 {
        lines.push("no matching tasks".to_string());
        return lines;
    }

    let first = (page.current_page - 1) * page.page_size + 1;
    if view.visible.is_empty() {
        lines.push(format!(
            "page {} of {} is empty ({} matching)",
            page.current_page, page.total_pages, view.total_matching
        ));
        return lines;
    }
    let last = first + view.visible.len() - 1;
    lines.push(format!(
        "tasks {}-{} of {} (page {}/{})",
        first, last, view.total_matching, page.current_page, page.total_pages
    ));
    for task in &view.visible {
        lines.push(format_task_line(task));
    }

    let mut hints = Vec::new();
    if page.load_more_available {
        hints.push("--expand for the full page".to_string());
    }
    if page.has_previous {
        hints.push(format!("--page {} for previous", page.current_page - 1));
    }
    if page.has_next {
        hints.push(format!("--page {} for next", page.current_page + 1));
    }
    if !hints.is_empty() {
        lines.push(format!("({})", hints.join(", ")));
    }
    lines
}

pub fn format_stats(stats: &TaskStats) -> String {
    format!(
        "total: {}  completed: {}  pending: {}",
        stats.total, stats.completed, stats.pending
    )
}
