pub mod search;
pub mod view;

pub use view::{PageInfo, TaskStats, TaskView, derive, stats, total_pages};
