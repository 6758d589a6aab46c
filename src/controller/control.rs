use super::TaskController;
use crate::gateway::{BoardError, TaskGateway};
use crate::model::view::{SortOrder, StatusFilter};

/// One user intent from the control surface (search box, selectors,
/// pagination buttons, task form and task actions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Search(String),
    Status(StatusFilter),
    Sort(SortOrder),
    Page(usize),
    PreviousPage,
    NextPage,
    /// "Load more" on the current page
    ExpandPage,
    Add(String),
    Toggle { id: String, is_complete: bool },
    Edit { id: String, title: String },
    Delete(String),
    Reload,
}

impl<G: TaskGateway + ?Sized> TaskController<G> {
    /// Route a control to the matching controller operation.
    ///
    /// View controls never fail. Mutations return the gateway's error after
    /// recording it as the transient notice.
    pub async fn dispatch(&mut self, control: Control) -> Result<(), BoardError> {
        match control {
            Control::Search(query) => self.set_search_query(&query),
            Control::Status(status) => self.set_status_filter(status),
            Control::Sort(order) => self.set_sort_order(order),
            Control::Page(page) => self.request_page(page),
            Control::PreviousPage => self.previous_page(),
            Control::NextPage => self.next_page(),
            Control::ExpandPage => self.request_expand_page(),
            Control::Add(title) => {
                self.add_task(&title).await?;
            }
            Control::Toggle { id, is_complete } => {
                self.toggle_task(&id, is_complete).await?;
            }
            Control::Edit { id, title } => {
                self.edit_task(&id, &title).await?;
            }
            Control::Delete(id) => self.delete_task(&id).await?,
            Control::Reload => self.reload().await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryStore;
    use crate::model::config::PagingConfig;
    use crate::model::task::Identity;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_dispatch_sequence() {
        let store = MemoryStore::new();
        let mut ctl = TaskController::new(Arc::new(store.clone()), PagingConfig::default());
        ctl.activate(Some(Identity::new("u1", "u1@example.com")))
            .await
            .unwrap();

        for title in ["Buy milk", "Walk dog", "Pay rent", "Call mom"] {
            ctl.dispatch(Control::Add(title.into())).await.unwrap();
        }
        assert_eq!(ctl.tasks().len(), 4);

        ctl.dispatch(Control::Search("MILK".into())).await.unwrap();
        let view = ctl.view();
        assert_eq!(view.visible.len(), 1);
        let milk_id = view.visible[0].id.clone();

        ctl.dispatch(Control::Toggle {
            id: milk_id.clone(),
            is_complete: true,
        })
        .await
        .unwrap();
        ctl.dispatch(Control::Search(String::new())).await.unwrap();
        ctl.dispatch(Control::Status(StatusFilter::Completed))
            .await
            .unwrap();
        assert_eq!(ctl.view().visible[0].id, milk_id);

        ctl.dispatch(Control::Status(StatusFilter::All)).await.unwrap();
        ctl.dispatch(Control::NextPage).await.unwrap();
        assert_eq!(ctl.controls().current_page, 2);
        ctl.dispatch(Control::ExpandPage).await.unwrap();
        assert!(ctl.view().page.expanded);
        ctl.dispatch(Control::PreviousPage).await.unwrap();
        assert_eq!(ctl.controls().current_page, 1);

        ctl.dispatch(Control::Delete(milk_id.clone())).await.unwrap();
        let err = ctl.dispatch(Control::Delete(milk_id)).await.unwrap_err();
        assert!(err.is_store());
        assert_eq!(ctl.tasks().len(), 3);
    }
}
