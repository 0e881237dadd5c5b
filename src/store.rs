// Task store: in-memory collections with write-through persistence

use crate::clock::Clock;
use crate::kv::KvStore;
use crate::models::{Category, NewCategory, NewTask, Task, TaskPatch, default_categories};
use crate::record::{Record, decode_collection, encode_collection, fresh_id};
use crate::view::Stats;
use chrono::Duration;
use eyre::{Context, Result};
use tracing::{debug, error, info, warn};

/// Owns the task and category collections and keeps them mirrored in a
/// key-value substrate
///
/// Every mutation changes the in-memory collection first and then rewrites
/// the whole collection under its key. A failed write is logged and returned;
/// the in-memory change is kept, so cache and substrate can diverge until the
/// next successful write or `reload`.
///
/// Mutations take `&mut self`: one caller drives each operation to completion
/// before the next starts.
pub struct TaskStore<S> {
    substrate: S,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    clock: Clock,
    loading: bool,
}

impl<S: KvStore> TaskStore<S> {
    /// Create an unloaded store; `is_loading` stays true until `load` runs
    pub fn new(substrate: S) -> Self {
        Self {
            substrate,
            tasks: Vec::new(),
            categories: Vec::new(),
            clock: Clock::new(),
            loading: true,
        }
    }

    /// Create a store and load it, logging rather than returning load errors
    pub async fn open(substrate: S) -> Self {
        let mut store = Self::new(substrate);
        if let Err(e) = store.load().await {
            warn!(error = ?e, "Failed to load data, continuing with what was read");
        }
        store
    }

    /// Read both collections from the substrate
    ///
    /// An absent task entry means no tasks. An absent category entry seeds
    /// the default categories and persists them. On error, collections not
    /// yet read are left unchanged.
    pub async fn load(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.load_collections().await;
        self.loading = false;
        result
    }

    /// Re-read both collections, discarding unpersisted divergence
    pub async fn reload(&mut self) -> Result<()> {
        self.load().await
    }

    async fn load_collections(&mut self) -> Result<()> {
        match self.read_collection::<Task>().await? {
            Some(tasks) => {
                info!(count = tasks.len(), "Loaded tasks");
                self.tasks = tasks;
            }
            None => self.tasks = Vec::new(),
        }

        match self.read_collection::<Category>().await? {
            Some(categories) => {
                info!(count = categories.len(), "Loaded categories");
                self.categories = categories;
            }
            None => {
                info!("No categories stored, seeding defaults");
                self.categories = default_categories();
                self.write_collection(&self.categories).await?;
            }
        }

        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// Give back the substrate, dropping the in-memory collections
    pub fn into_substrate(self) -> S {
        self.substrate
    }

    // ========================================================================
    // Task operations
    // ========================================================================

    /// Create a task at the front of the collection
    pub async fn add_task(&mut self, new: NewTask) -> Result<Task> {
        let now = self.clock.now();
        let task = Task::from_new(fresh_id(&self.tasks), new, now);
        debug!(id = %task.id, "Adding task");

        self.tasks.insert(0, task.clone());
        self.write_collection(&self.tasks).await?;
        Ok(task)
    }

    /// Merge `patch` into the task with `id`; `Ok(None)` if there is none
    pub async fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update_task: no such task");
            return Ok(None);
        };

        // Stored stamps may be ahead of the wall clock; stay past this task's own
        let now = self.clock.now().max(task.updated_at + Duration::milliseconds(1));
        task.apply(patch, now);
        let updated = task.clone();

        self.write_collection(&self.tasks).await?;
        Ok(Some(updated))
    }

    /// Remove the task with `id`; returns whether one was removed
    pub async fn delete_task(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "delete_task: no such task");
            return Ok(false);
        };

        self.tasks.remove(pos);
        self.write_collection(&self.tasks).await?;
        Ok(true)
    }

    /// Flip `completed` on the task with `id`
    pub async fn toggle_task(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(completed) = self.task(id).map(|t| t.completed) else {
            return Ok(None);
        };
        self.update_task(id, TaskPatch::completed(!completed)).await
    }

    // ========================================================================
    // Category operations
    // ========================================================================

    pub async fn add_category(&mut self, new: NewCategory) -> Result<Category> {
        let category = Category {
            id: fresh_id(&self.categories),
            name: new.name,
            color: new.color,
        };
        debug!(id = %category.id, name = %category.name, "Adding category");

        self.categories.push(category.clone());
        self.write_collection(&self.categories).await?;
        Ok(category)
    }

    /// Remove a category; tasks referencing it keep the dangling id
    pub async fn delete_category(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.categories.iter().position(|c| c.id == id) else {
            debug!(id, "delete_category: no such category");
            return Ok(false);
        };

        self.categories.remove(pos);
        self.write_collection(&self.categories).await?;
        Ok(true)
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    pub fn get_stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    /// Tasks whose category is `category_id`, in collection order
    pub fn get_tasks_by_category(&self, category_id: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.category == category_id).collect()
    }

    // ========================================================================
    // Substrate helpers
    // ========================================================================

    async fn read_collection<T: Record>(&self) -> Result<Option<Vec<T>>> {
        let key = T::storage_key();
        let Some(json) = self
            .substrate
            .get(key)
            .await
            .with_context(|| format!("Failed to read {}", key))?
            .filter(|json| !json.is_empty())
        else {
            debug!(key, "No stored collection");
            return Ok(None);
        };

        decode_collection(&json).map(Some)
    }

    async fn write_collection<T: Record>(&self, records: &[T]) -> Result<()> {
        let key = T::storage_key();
        let json = encode_collection(records)?;

        self.substrate
            .set(key, json)
            .await
            .with_context(|| format!("Failed to write {}", key))
            .inspect_err(|e| error!(key, error = ?e, "Failed to persist collection"))?;

        debug!(key, count = records.len(), "Persisted collection");
        Ok(())
    }
}
