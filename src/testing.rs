//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

use crate::tasks::{StoreError, StoreResult, Task, TaskId, TaskPatch, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

/// The kind of store call, used to target failures and gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `list()`
    List,
    /// `create(text)`
    Create,
    /// `update(id, patch)`
    Update,
    /// `delete(id)`
    Delete,
}

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `list()` was called.
    List,
    /// `create(text)` was called.
    Create(String),
    /// `update(id, patch)` was called.
    Update(TaskId, TaskPatch),
    /// `delete(id)` was called.
    Delete(TaskId),
}

#[derive(Debug)]
struct MockState {
    /// Rows, newest first.
    tasks: Vec<Task>,
    next_id: i64,
    clock: DateTime<Utc>,
    failures: HashMap<StoreOp, VecDeque<String>>,
    calls: Vec<StoreCall>,
}

/// An in-memory task store for testing.
///
/// Behaves like the remote table (store-assigned ids and timestamps,
/// newest-first listing, partial updates) and additionally lets tests
/// inject failures and hold calls until released.
#[derive(Debug)]
pub struct MockTaskStore {
    state: Mutex<MockState>,
    gates: Mutex<HashMap<StoreOp, Arc<Semaphore>>>,
}

impl Default for MockTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTaskStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                tasks: Vec::new(),
                next_id: 1,
                clock: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().unwrap_or_default(),
                failures: HashMap::new(),
                calls: Vec::new(),
            }),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Create a mock store seeded with tasks, oldest first.
    #[must_use]
    pub fn with_tasks(texts: &[&str]) -> Self {
        let store = Self::new();
        for text in texts {
            store.insert(text, false);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Insert a row directly, without recording a call.
    pub fn insert(&self, text: &str, is_completed: bool) -> Task {
        let mut state = self.lock();
        let task = Self::new_row(&mut state, text);
        let task = Task { is_completed, ..task };
        state.tasks.insert(0, task.clone());
        task
    }

    fn new_row(state: &mut MockState, text: &str) -> Task {
        let id = TaskId::from(state.next_id);
        state.next_id += 1;
        state.clock += Duration::minutes(1);
        Task { id, text: text.to_string(), is_completed: false, created_at: state.clock }
    }

    /// Make the next call of the given kind fail with `message`.
    ///
    /// Multiple failures for the same kind are consumed in order.
    pub fn fail_next(&self, op: StoreOp, message: &str) {
        self.lock().failures.entry(op).or_default().push_back(message.to_string());
    }

    /// Hold every call of the given kind until a permit is added to the returned gate.
    ///
    /// Each `add_permits(1)` releases one waiting call.
    pub fn hold(&self, op: StoreOp) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(op, Arc::clone(&gate));
        gate
    }

    /// Stop holding calls of the given kind.
    pub fn release(&self, op: StoreOp) {
        let gate = self.gates.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&op);
        if let Some(gate) = gate {
            gate.close();
        }
    }

    /// Current rows, newest first, without recording a call.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// All calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Wait for the gate of `op` (if any), record the call, and pop a pending failure.
    async fn enter(&self, op: StoreOp, call: StoreCall) -> StoreResult<()> {
        let gate = self
            .gates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&op)
            .cloned();
        if let Some(gate) = gate {
            // A closed gate means the hold was released for good.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        self.enter(StoreOp::List, StoreCall::List).await?;
        Ok(self.snapshot())
    }

    async fn create(&self, text: &str) -> StoreResult<Task> {
        self.enter(StoreOp::Create, StoreCall::Create(text.to_string())).await?;
        let mut state = self.lock();
        let task = Self::new_row(&mut state, text);
        state.tasks.insert(0, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        self.enter(StoreOp::Update, StoreCall::Update(id.clone(), patch.clone())).await?;
        let mut state = self.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<bool> {
        self.enter(StoreOp::Delete, StoreCall::Delete(id.clone())).await?;
        let mut state = self.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| &t.id != id);
        Ok(state.tasks.len() != before)
    }
}
