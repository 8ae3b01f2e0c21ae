//! The task list controller.
//!
//! Owns the view state, issues store calls, and reconciles the local task
//! list with what the store reports. Delete and toggle are applied locally
//! before the call resolves and are repaired with a full re-fetch if the
//! call fails; create and edit wait for the store's row.
//!
//! The controller is cheap to clone. Clones share state, so commands can be
//! spawned onto the runtime while the caller keeps handling input. No
//! ordering is enforced between in-flight calls: whichever resolves last
//! wins.

use crate::tasks::{StoreError, TaskId, TaskPatch, TaskStore};
use crate::view::state::{Submission, TaskListState};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Shared {
    state: TaskListState,
    active: bool,
}

/// Controller for a single task list view.
#[derive(Debug)]
pub struct TaskList<S> {
    store: Arc<S>,
    shared: Arc<Mutex<Shared>>,
}

impl<S> Clone for TaskList<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), shared: Arc::clone(&self.shared) }
    }
}

impl<S: TaskStore> TaskList<S> {
    /// Create an active view over a store, with an empty task list.
    pub fn new(store: S) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Create an active view over a store that is shared with other owners.
    pub fn with_shared_store(store: Arc<S>) -> Self {
        Self {
            store,
            shared: Arc::new(Mutex::new(Shared { state: TaskListState::new(), active: true })),
        }
    }

    /// The store this view talks to.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current view state.
    #[must_use]
    pub fn snapshot(&self) -> TaskListState {
        self.lock().state.clone()
    }

    /// Whether the view is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Tear the view down.
    ///
    /// After this returns, results of calls that are still in flight are
    /// discarded and no new calls are issued.
    pub fn deactivate(&self) {
        self.lock().active = false;
        tracing::debug!("task list deactivated");
    }

    /// Apply a transition if the view is still active.
    fn apply<R>(&self, transition: impl FnOnce(&mut TaskListState) -> R) -> Option<R> {
        let mut shared = self.lock();
        if !shared.active {
            tracing::debug!("discarding state change after deactivation");
            return None;
        }
        Some(transition(&mut shared.state))
    }

    fn fail(&self, error: &StoreError) {
        self.apply(|state| state.record_error(error));
    }

    // === Local commands ===

    /// Replace the input text.
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.apply(|state| state.set_input(text));
    }

    /// Put a task into edit mode. Returns `false` if it is not in the local list.
    pub fn begin_edit(&self, id: &TaskId) -> bool {
        self.apply(|state| state.begin_edit(id)).unwrap_or(false)
    }

    /// Leave edit mode.
    pub fn cancel_edit(&self) {
        self.apply(TaskListState::cancel_edit);
    }

    /// Flip the visibility filter.
    pub fn toggle_show_completed(&self) {
        self.apply(TaskListState::toggle_show_completed);
    }

    // === Store-backed commands ===
    //
    // Each command comes in two forms. `start_*` applies the local change
    // right away and returns the store call as a future that owns a handle
    // to the view, ready to be spawned. The `async fn` form does both and
    // waits. `start_*` returns `None` when there is nothing to send.

    /// Mark the view as loading and return the load from the store.
    pub fn start_load(&self) -> Option<impl Future<Output = ()> + Send + 'static>
    where
        S: 'static,
    {
        self.apply(TaskListState::begin_load)?;
        let list = self.clone();
        Some(async move { list.complete_load().await })
    }

    /// Load the full list from the store, replacing the local list.
    pub async fn load(&self) {
        if self.apply(TaskListState::begin_load).is_some() {
            self.complete_load().await;
        }
    }

    async fn complete_load(&self) {
        let result = self.store.list().await;
        if let Err(ref err) = result {
            tracing::warn!(error = %err, "loading tasks failed");
        }
        self.apply(|state| state.finish_load(result));
    }

    /// Take the input as a submission now and return the store call.
    ///
    /// The input is cleared before this returns, so later typing does not
    /// change what is sent.
    pub fn start_submit(&self) -> Option<impl Future<Output = ()> + Send + 'static>
    where
        S: 'static,
    {
        let submission = self.apply(TaskListState::begin_submit).flatten()?;
        let list = self.clone();
        Some(async move { list.complete_submit(submission).await })
    }

    /// Submit the form: create a task, or update the one being edited.
    ///
    /// Blank input is ignored. Nothing is changed locally until the store
    /// answers, so a failure only records the error.
    pub async fn submit(&self) {
        if let Some(submission) = self.apply(TaskListState::begin_submit).flatten() {
            self.complete_submit(submission).await;
        }
    }

    async fn complete_submit(&self, submission: Submission) {
        let result = match &submission {
            Submission::Create { text } => self.store.create(text).await,
            Submission::Update { id, text } => {
                self.store.update(id, &TaskPatch::text(text.as_str())).await
            }
        };
        if let Err(ref err) = result {
            tracing::warn!(error = %err, ?submission, "submitting task failed");
        }
        self.apply(|state| state.finish_submit(&submission, result));
    }

    /// Remove a task locally now and return the store call.
    pub fn start_delete(&self, id: &TaskId) -> Option<impl Future<Output = ()> + Send + 'static>
    where
        S: 'static,
    {
        self.apply(|state| state.remove_task(id))?;
        let list = self.clone();
        let id = id.clone();
        Some(async move { list.complete_delete(&id).await })
    }

    /// Delete a task, removing it locally before the store confirms.
    pub async fn delete(&self, id: &TaskId) {
        if self.apply(|state| state.remove_task(id)).is_some() {
            self.complete_delete(id).await;
        }
    }

    async fn complete_delete(&self, id: &TaskId) {
        if let Err(err) = self.store.delete(id).await {
            tracing::warn!(%id, error = %err, "deleting task failed; re-fetching");
            self.fail(&err);
            self.resync().await;
        }
    }

    /// Flip a task's completion flag locally now and return the store call.
    ///
    /// Returns `None` for ids that are not in the local list.
    pub fn start_toggle(&self, id: &TaskId) -> Option<impl Future<Output = ()> + Send + 'static>
    where
        S: 'static,
    {
        let is_completed = self.apply(|state| state.begin_toggle(id)).flatten()?;
        let list = self.clone();
        let id = id.clone();
        Some(async move { list.complete_toggle(&id, is_completed).await })
    }

    /// Flip a task's completion flag, locally first, then in the store.
    ///
    /// Unknown ids are ignored.
    pub async fn toggle_completion(&self, id: &TaskId) {
        if let Some(is_completed) = self.apply(|state| state.begin_toggle(id)).flatten() {
            self.complete_toggle(id, is_completed).await;
        }
    }

    async fn complete_toggle(&self, id: &TaskId, is_completed: bool) {
        match self.store.update(id, &TaskPatch::completed(is_completed)).await {
            Ok(task) => {
                self.apply(|state| state.replace_task(task));
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "toggling task failed; re-fetching");
                self.fail(&err);
                self.resync().await;
            }
        }
    }

    /// Replace the local list with the store's after a failed optimistic change.
    async fn resync(&self) {
        match self.store.list().await {
            Ok(tasks) => {
                self.apply(|state| state.replace_all(tasks));
            }
            Err(err) => {
                tracing::warn!(error = %err, "re-fetching tasks failed");
                self.fail(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTaskStore, StoreCall, StoreOp};

    fn ids(state: &TaskListState) -> Vec<String> {
        state.tasks.iter().map(|t| t.id.to_string()).collect()
    }

    async fn loaded(store: MockTaskStore) -> TaskList<MockTaskStore> {
        let list = TaskList::new(store);
        list.load().await;
        list
    }

    /// Local tasks match what the store would list.
    fn assert_converged(list: &TaskList<MockTaskStore>) {
        assert_eq!(list.snapshot().tasks, list.store().snapshot());
    }

    #[tokio::test]
    async fn test_initial_load() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk", "Walk dog"])).await;
        let state = list.snapshot();

        assert!(!state.loading);
        assert!(state.error_message.is_none());
        assert_eq!(ids(&state), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_initial_load_failure_records_error() {
        let store = MockTaskStore::with_tasks(&["Buy milk"]);
        store.fail_next(StoreOp::List, "network down");
        let list = loaded(store).await;
        let state = list.snapshot();

        assert!(!state.loading);
        assert!(state.tasks.is_empty());
        assert_eq!(state.error_message.as_deref(), Some("network down"));
    }

    #[tokio::test]
    async fn test_load_result_discarded_after_deactivation() {
        let store = MockTaskStore::with_tasks(&["Buy milk"]);
        let gate = store.hold(StoreOp::List);
        let list = TaskList::new(store);

        let pending = tokio::spawn({
            let list = list.clone();
            async move { list.load().await }
        });
        tokio::task::yield_now().await;
        assert!(list.snapshot().loading);

        list.deactivate();
        gate.add_permits(1);
        pending.await.unwrap();

        let state = list.snapshot();
        assert!(state.tasks.is_empty());
        assert!(state.loading, "no state change may be applied after deactivation");
        assert!(!list.is_active());
    }

    #[tokio::test]
    async fn test_deactivated_view_issues_no_calls() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.deactivate();

        list.set_input("Walk dog");
        list.submit().await;
        list.delete(&TaskId::from(1)).await;
        list.toggle_completion(&TaskId::from(1)).await;

        assert_eq!(list.store().calls(), vec![StoreCall::List]);
        assert_eq!(list.snapshot().tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_create_prepends_returned_row() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;

        list.set_input("Walk dog");
        list.submit().await;

        let state = list.snapshot();
        assert_eq!(ids(&state), vec!["2", "1"]);
        assert_eq!(state.tasks[0].text, "Walk dog");
        assert!(!state.tasks[0].is_completed);
        assert!(state.input_text.is_empty());
        assert!(!state.loading);
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_create_then_list_round_trip() {
        let list = loaded(MockTaskStore::new()).await;
        list.set_input("Water plants");
        list.submit().await;

        let listed = list.store().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "Water plants");
        assert!(!listed[0].is_completed);
    }

    #[tokio::test]
    async fn test_create_failure_keeps_tasks_and_does_not_refetch() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.store().fail_next(StoreOp::Create, "insert denied");

        list.set_input("Walk dog");
        list.submit().await;

        let state = list.snapshot();
        assert_eq!(ids(&state), vec!["1"]);
        assert_eq!(state.error_message.as_deref(), Some("insert denied"));
        assert!(!state.loading);
        assert_eq!(
            list.store().calls(),
            vec![StoreCall::List, StoreCall::Create("Walk dog".into())]
        );
    }

    #[tokio::test]
    async fn test_blank_submit_issues_no_call() {
        let list = loaded(MockTaskStore::new()).await;
        list.set_input("   ");
        list.submit().await;
        assert_eq!(list.store().calls(), vec![StoreCall::List]);
    }

    #[tokio::test]
    async fn test_edit_flow_updates_instead_of_creating() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        let id = TaskId::from(1);

        assert!(list.begin_edit(&id));
        assert_eq!(list.snapshot().input_text, "Buy milk");

        list.set_input("Buy oat milk");
        list.submit().await;

        let state = list.snapshot();
        assert!(state.edit_target.is_none());
        assert_eq!(state.tasks[0].text, "Buy oat milk");
        assert_eq!(
            list.store().calls(),
            vec![StoreCall::List, StoreCall::Update(id, TaskPatch::text("Buy oat milk"))]
        );
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_edit_failure_leaves_tasks_unchanged() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.store().fail_next(StoreOp::Update, "update denied");

        list.begin_edit(&TaskId::from(1));
        list.set_input("Buy oat milk");
        list.submit().await;

        let state = list.snapshot();
        assert_eq!(state.tasks[0].text, "Buy milk");
        assert_eq!(state.error_message.as_deref(), Some("update denied"));
        assert_eq!(state.edit_target, Some(TaskId::from(1)));
        assert_eq!(
            list.store().calls(),
            vec![StoreCall::List, StoreCall::Update(TaskId::from(1), TaskPatch::text("Buy oat milk"))],
            "a failed edit is not followed by a re-fetch"
        );
    }

    #[tokio::test]
    async fn test_begin_edit_unknown_id() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        assert!(!list.begin_edit(&TaskId::from(42)));
        assert!(list.snapshot().edit_target.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_before_store_confirms() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk", "Walk dog"])).await;
        let gate = list.store().hold(StoreOp::Delete);

        let pending = tokio::spawn({
            let list = list.clone();
            async move { list.delete(&TaskId::from(1)).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(ids(&list.snapshot()), vec!["2"]);
        assert_eq!(list.store().snapshot().len(), 2);

        gate.add_permits(1);
        pending.await.unwrap();
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_failed_delete_restores_task() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk", "Walk dog"])).await;
        list.store().fail_next(StoreOp::Delete, "delete denied");

        list.delete(&TaskId::from(1)).await;

        let state = list.snapshot();
        assert!(state.find(&TaskId::from(1)).is_some());
        assert_eq!(state.error_message.as_deref(), Some("delete denied"));
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_toggle_is_optimistic_then_confirmed() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        let id = TaskId::from(1);
        let gate = list.store().hold(StoreOp::Update);

        let pending = tokio::spawn({
            let list = list.clone();
            let id = id.clone();
            async move { list.toggle_completion(&id).await }
        });
        tokio::task::yield_now().await;
        assert!(list.snapshot().tasks[0].is_completed, "flag flips before the store answers");
        assert!(!list.store().snapshot()[0].is_completed);

        gate.add_permits(1);
        pending.await.unwrap();

        assert!(list.snapshot().tasks[0].is_completed);
        assert_eq!(
            list.store().calls(),
            vec![StoreCall::List, StoreCall::Update(id, TaskPatch::completed(true))]
        );
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_original_value() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        let id = TaskId::from(1);

        list.toggle_completion(&id).await;
        list.toggle_completion(&id).await;

        assert!(!list.snapshot().tasks[0].is_completed);
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_failed_toggle_reverts_via_refetch() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.store().fail_next(StoreOp::Update, "update denied");

        list.toggle_completion(&TaskId::from(1)).await;

        let state = list.snapshot();
        assert!(!state.tasks[0].is_completed);
        assert_eq!(state.error_message.as_deref(), Some("update denied"));
        assert_eq!(list.store().calls().last(), Some(&StoreCall::List));
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_failed_refetch_overwrites_error() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.store().fail_next(StoreOp::Delete, "delete denied");
        list.store().fail_next(StoreOp::List, "list denied");

        list.delete(&TaskId::from(1)).await;

        let state = list.snapshot();
        assert_eq!(state.error_message.as_deref(), Some("list denied"));
        assert!(state.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_is_noop() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        list.toggle_completion(&TaskId::from(9)).await;
        assert_eq!(list.store().calls(), vec![StoreCall::List]);
    }

    #[tokio::test]
    async fn test_toggle_show_completed_is_local() {
        let store = MockTaskStore::new();
        store.insert("Buy milk", true);
        store.insert("Walk dog", false);
        let list = loaded(store).await;

        assert_eq!(list.snapshot().visible_tasks().count(), 2);
        list.toggle_show_completed();
        let state = list.snapshot();
        assert!(!state.show_completed);
        assert_eq!(state.visible_tasks().count(), 1);
        assert_eq!(list.store().calls(), vec![StoreCall::List]);
    }

    #[tokio::test]
    async fn test_converges_after_every_operation() {
        let list = loaded(MockTaskStore::with_tasks(&["a task", "another"])).await;

        list.set_input("third task");
        list.submit().await;
        assert_converged(&list);

        list.toggle_completion(&TaskId::from(3)).await;
        assert_converged(&list);

        list.begin_edit(&TaskId::from(2));
        list.set_input("renamed");
        list.submit().await;
        assert_converged(&list);

        list.store().fail_next(StoreOp::Delete, "nope");
        list.delete(&TaskId::from(1)).await;
        assert_converged(&list);

        list.delete(&TaskId::from(1)).await;
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_concurrent_commands_last_resolved_wins() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;
        let id = TaskId::from(1);
        let gate = list.store().hold(StoreOp::Update);

        let toggle = tokio::spawn({
            let list = list.clone();
            let id = id.clone();
            async move { list.toggle_completion(&id).await }
        });
        tokio::task::yield_now().await;

        list.delete(&id).await;
        assert!(list.snapshot().tasks.is_empty());

        gate.add_permits(1);
        toggle.await.unwrap();

        let state = list.snapshot();
        assert!(state.tasks.is_empty());
        assert_eq!(state.error_message.as_deref(), Some("task not found: 1"));
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_start_applies_local_changes_before_the_call_runs() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk", "Walk dog"])).await;

        let toggle = list.start_toggle(&TaskId::from(1)).unwrap();
        let delete = list.start_delete(&TaskId::from(2)).unwrap();

        let state = list.snapshot();
        assert_eq!(ids(&state), vec!["1"]);
        assert!(state.tasks[0].is_completed);
        assert_eq!(list.store().calls(), vec![StoreCall::List]);

        toggle.await;
        delete.await;
        assert_converged(&list);
    }

    #[tokio::test]
    async fn test_start_submit_takes_the_input_immediately() {
        let list = loaded(MockTaskStore::new()).await;
        list.set_input("Buy milk");

        let submit = list.start_submit().unwrap();
        let state = list.snapshot();
        assert!(state.input_text.is_empty());
        assert!(state.loading);

        list.set_input("xy");
        submit.await;

        assert_eq!(
            list.store().calls(),
            vec![StoreCall::List, StoreCall::Create("Buy milk".to_string())]
        );
        assert_eq!(list.snapshot().input_text, "xy");
    }

    #[tokio::test]
    async fn test_start_returns_none_when_nothing_to_send() {
        let list = loaded(MockTaskStore::with_tasks(&["Buy milk"])).await;

        assert!(list.start_submit().is_none());
        assert!(list.start_toggle(&TaskId::from(9)).is_none());

        list.deactivate();
        assert!(list.start_load().is_none());
        assert!(list.start_delete(&TaskId::from(1)).is_none());
        assert_eq!(list.store().calls(), vec![StoreCall::List]);
    }
}
