//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::context::LifecycleContext;
use crate::core::interval::{IntervalId, IntervalTask, Scheduler};
use crate::core::route::{Route, RouteError};
use crate::core::state::{Coordinator, CoordinatorOptions};
use crate::render::MemoryDocument;
use crate::router::{
    NavigateOptions, PathRouter, RouteEvent, RouteEventSink, RouteExtension, Router,
    RouterFactory,
};

/// Ordered record of lifecycle calls, shared between routes and hooks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub enum InitOutcome {
    Succeed,
    Fail(&'static str),
    Panic,
    /// Completes once the notify fires.
    Gate(Arc<Notify>),
}

/// A route that logs `name:init`, `name:init_route(id)` and `name:cleanup`.
pub struct RecordingRoute {
    name: String,
    log: CallLog,
    outcome: Mutex<InitOutcome>,
    intervals: AtomicUsize,
}

impl RecordingRoute {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            outcome: Mutex::new(InitOutcome::Succeed),
            intervals: AtomicUsize::new(0),
        })
    }

    pub fn with_outcome(self: Arc<Self>, outcome: InitOutcome) -> Arc<Self> {
        *self.outcome.lock().unwrap() = outcome;
        self
    }

    /// Registers `count` section intervals during init.
    pub fn with_intervals(self: Arc<Self>, count: usize) -> Arc<Self> {
        self.intervals.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Route for RecordingRoute {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: LifecycleContext) -> Result<(), RouteError> {
        self.log.push(&format!("{}:init", self.name));
        for _ in 0..self.intervals.load(Ordering::SeqCst) {
            ctx.create_section_interval(|| {}, Duration::from_millis(100));
        }
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            InitOutcome::Succeed => Ok(()),
            InitOutcome::Fail(message) => Err(RouteError::new(message)),
            InitOutcome::Panic => panic!("{} blew up", self.name),
            InitOutcome::Gate(gate) => {
                gate.notified().await;
                Ok(())
            }
        }
    }

    fn init_route(&self, _ctx: &LifecycleContext, route_id: Option<&str>) {
        self.log
            .push(&format!("{}:init_route({})", self.name, route_id.unwrap_or("-")));
    }

    fn cleanup(&self) {
        self.log.push(&format!("{}:cleanup", self.name));
    }
}

/// Scheduler that never runs anything, only counts.
#[derive(Default)]
pub struct RecordingScheduler {
    next_id: AtomicU64,
    started: AtomicUsize,
    cleared: Mutex<Vec<IntervalId>>,
}

impl RecordingScheduler {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn cleared(&self) -> Vec<IntervalId> {
        self.cleared.lock().unwrap().clone()
    }
}

impl Scheduler for RecordingScheduler {
    fn set_interval(&self, _task: IntervalTask, _period: Duration) -> IntervalId {
        self.started.fetch_add(1, Ordering::SeqCst);
        IntervalId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn clear_interval(&self, id: IntervalId) {
        self.cleared.lock().unwrap().push(id);
    }
}

/// Creates a coordinator over a document holding an empty `app` container.
pub fn test_coordinator() -> (Coordinator, Arc<MemoryDocument>, Arc<RecordingScheduler>) {
    let doc = Arc::new(MemoryDocument::new().with_element("app", ""));
    let scheduler = Arc::new(RecordingScheduler::default());
    let coordinator =
        Coordinator::new(CoordinatorOptions::new("app"), doc.clone(), scheduler.clone())
            .unwrap_or_else(|e| panic!("test coordinator: {e}"));
    (coordinator, doc, scheduler)
}

/// Observes router construction and use. Routing itself is delegated to a
/// [`PathRouter`].
#[derive(Default)]
pub struct RouterProbe {
    constructed: AtomicUsize,
    listened: AtomicUsize,
    extensions_seen: AtomicUsize,
    navigations: Mutex<Vec<(String, NavigateOptions)>>,
    sink: Mutex<Option<RouteEventSink>>,
}

impl RouterProbe {
    pub fn factory(self: &Arc<Self>) -> RouterFactory {
        let probe = self.clone();
        Box::new(move |extensions: &[RouteExtension]| -> Box<dyn Router> {
            probe.constructed.fetch_add(1, Ordering::SeqCst);
            probe.extensions_seen.store(extensions.len(), Ordering::SeqCst);
            Box::new(ProbeRouter {
                inner: PathRouter::new(extensions),
                probe,
            })
        })
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn listened(&self) -> usize {
        self.listened.load(Ordering::SeqCst)
    }

    pub fn extensions_seen(&self) -> usize {
        self.extensions_seen.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<(String, NavigateOptions)> {
        self.navigations.lock().unwrap().clone()
    }

    /// Emits an event as if the router had resolved it.
    pub fn emit(&self, event: RouteEvent) -> bool {
        let sink = self.sink.lock().unwrap().clone();
        sink.is_some_and(|sink| sink.emit(event))
    }
}

struct ProbeRouter {
    probe: Arc<RouterProbe>,
    inner: PathRouter,
}

impl Router for ProbeRouter {
    fn listen(&mut self, sink: RouteEventSink) {
        self.probe.listened.fetch_add(1, Ordering::SeqCst);
        *self.probe.sink.lock().unwrap() = Some(sink.clone());
        self.inner.listen(sink);
    }

    fn navigate(&mut self, path: &str, options: NavigateOptions) {
        self.probe
            .navigations
            .lock()
            .unwrap()
            .push((path.to_string(), options));
        self.inner.navigate(path, options);
    }
}
