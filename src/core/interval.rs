//! # Scoped Intervals
//!
//! Periodic tasks registered by sections and routes. Every task belongs to a
//! scope, and the coordinator clears the whole scope in one go when it ends.
//!
//! ```text
//! Intervals (cloneable handle)
//! ├── scheduler: Arc<dyn Scheduler>     // who actually runs the timers
//! ├── section: Vec<IntervalId>          // cleared on every navigation
//! ├── parent: Vec<IntervalId>           // cleared when the parent changes
//! └── generations                       // bumped on every clear
//! ```
//!
//! A registration carries the generation its caller observed. If the scope
//! was cleared in the meantime the task is refused instead of leaking into
//! the next scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Shortest period a task may run at. A zero period is clamped to this.
pub const MIN_INTERVAL_PERIOD: Duration = Duration::from_millis(1);

/// A periodic task body.
pub type IntervalTask = Box<dyn FnMut() + Send + 'static>;

/// Opaque timer identifier handed out by a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(pub u64);

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval#{}", self.0)
    }
}

/// Lifetime boundary of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalScope {
    /// Ends on every navigation cycle.
    Section,
    /// Ends when the active parent section changes or goes away.
    ParentSection,
}

/// Runs periodic tasks. Implementations own the timers; the registry only
/// keeps ids.
pub trait Scheduler: Send + Sync {
    fn set_interval(&self, task: IntervalTask, period: Duration) -> IntervalId;

    fn clear_interval(&self, id: IntervalId);
}

// ============================================================================
// Tokio scheduler
// ============================================================================

/// Scheduler backed by one Tokio task per interval.
///
/// Like a browser `setInterval`, the first run happens one period after
/// registration, not immediately.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<IntervalId, AbortHandle>>,
}

impl TokioScheduler {
    /// Binds the scheduler to the current Tokio runtime.
    ///
    /// Panics when called outside a runtime, like `tokio::spawn`.
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of timers currently running.
    pub fn running(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Scheduler for TokioScheduler {
    fn set_interval(&self, mut task: IntervalTask, period: Duration) -> IntervalId {
        let id = IntervalId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let period = period.max(MIN_INTERVAL_PERIOD);
        let handle = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // tokio's first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                task();
            }
        });
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle.abort_handle());
        debug!("Started {} every {:?}", id, period);
        id
    }

    fn clear_interval(&self, id: IntervalId) {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match handle {
            Some(handle) => {
                handle.abort();
                debug!("Cleared {}", id);
            }
            None => warn!("Tried to clear unknown {}", id),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

struct Registry {
    scheduler: Arc<dyn Scheduler>,
    section: Vec<IntervalId>,
    parent: Vec<IntervalId>,
    section_generation: u64,
    parent_generation: u64,
}

impl Registry {
    fn ids_mut(&mut self, scope: IntervalScope) -> &mut Vec<IntervalId> {
        match scope {
            IntervalScope::Section => &mut self.section,
            IntervalScope::ParentSection => &mut self.parent,
        }
    }

    fn generation(&self, scope: IntervalScope) -> u64 {
        match scope {
            IntervalScope::Section => self.section_generation,
            IntervalScope::ParentSection => self.parent_generation,
        }
    }
}

/// Per-coordinator interval bookkeeping, shared with the contexts handed to
/// sections and routes.
#[derive(Clone)]
pub struct Intervals {
    inner: Arc<Mutex<Registry>>,
}

impl Intervals {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                scheduler,
                section: Vec::new(),
                parent: Vec::new(),
                section_generation: 0,
                parent_generation: 0,
            })),
        }
    }


    /// Registers `task` only if `generation` is still the scope's current one.
    pub(crate) fn create_in(
        &self,
        scope: IntervalScope,
        generation: u64,
        task: IntervalTask,
        period: Duration,
    ) -> Option<IntervalId> {
        let mut registry = self.lock();
        if registry.generation(scope) != generation {
            debug!(
                "Refusing {:?} interval from ended scope (generation {} != {})",
                scope,
                generation,
                registry.generation(scope)
            );
            return None;
        }
        let id = registry.scheduler.set_interval(task, period);
        registry.ids_mut(scope).push(id);
        Some(id)
    }

    /// Clears every interval registered under `scope` and starts a new
    /// generation. Returns how many were cleared.
    pub(crate) fn clear(&self, scope: IntervalScope) -> usize {
        let mut registry = self.lock();
        let ids = std::mem::take(registry.ids_mut(scope));
        for id in &ids {
            registry.scheduler.clear_interval(*id);
        }
        match scope {
            IntervalScope::Section => registry.section_generation += 1,
            IntervalScope::ParentSection => registry.parent_generation += 1,
        }
        if !ids.is_empty() {
            debug!("Cleared {} {:?} interval(s)", ids.len(), scope);
        }
        ids.len()
    }

    pub fn generation(&self, scope: IntervalScope) -> u64 {
        self.lock().generation(scope)
    }

    /// Ids currently registered under `scope`, in registration order.
    pub fn active(&self, scope: IntervalScope) -> Vec<IntervalId> {
        let mut registry = self.lock();
        registry.ids_mut(scope).clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
