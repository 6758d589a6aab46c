use crate::model::task::Task;
use crate::model::view::StatusFilter;

/// A lowercased search needle, built once per derivation.
#[derive(Debug, Clone)]
pub struct TitleQuery {
    needle: String,
}

impl TitleQuery {
    pub fn new(query: &str) -> Self {
        TitleQuery {
            needle: query.to_lowercase(),
        }
    }

    /// Case-insensitive substring match on the title. An empty query
    /// matches everything.
    pub fn matches(&self, task: &Task) -> bool {
        self.needle.is_empty() || task.title.to_lowercase().contains(&self.needle)
    }
}

/// Whether a task passes the completion filter
pub fn matches_status(task: &Task, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::All => true,
        StatusFilter::Completed => task.is_complete,
        StatusFilter::Pending => !task.is_complete,
    }
}
