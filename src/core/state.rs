//! # Coordinator State
//!
//! Everything the navigation lifecycle owns, in one place. All fields are
//! per instance; two coordinators never share a registry.
//!
//! ```text
//! Coordinator
//! ├── route_container: String             // element routes render into
//! ├── debug: bool                         // per-event tracing
//! ├── renderer: Arc<dyn RenderPort>       // document access
//! ├── intervals: Intervals                // section / parent scoped timers
//! ├── sections: HashMap<String, Section>  // registry, last write wins
//! ├── active_section / active_route       // the route being shown
//! ├── active_parent_section: Option<name> // ancestor scope
//! ├── route_extensions: Vec<Map>          // consumed by the router factory
//! ├── routes_initialized: bool            // startup happens once
//! ├── phase / cycle / in_flight           // current navigation cycle
//! └── last_failure: Option<InitFailure>   // most recent init outcome
//! ```
//!
//! Navigation transitions live in `action.rs`; this file holds setup,
//! registration and accessors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::task::AbortHandle;

use crate::core::context::LifecycleContext;
use crate::core::interval::{IntervalScope, Intervals, Scheduler};
use crate::core::route::Route;
use crate::core::section::{Section, SectionOptions};
use crate::render::{self, CompiledTemplate, RenderPort};
use crate::router::RouteExtension;

// ============================================================================
// Options and errors
// ============================================================================

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Id of the element routes render into. Required.
    pub route_container: Option<String>,
    pub debug: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            route_container: None,
            debug: true,
        }
    }
}

impl CoordinatorOptions {
    pub fn new(route_container: impl Into<String>) -> Self {
        Self {
            route_container: Some(route_container.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// No `route_container` was given.
    MissingRouteContainer,
    /// The `route_container` element is not in the document.
    RouteContainerNotFound(String),
    /// A route extension was not a JSON object.
    InvalidExtension(&'static str),
    /// `create_section` was called without a name.
    MissingSectionName,
    /// `navigate` was called before `init_routes`.
    RoutesNotInitialized,
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorError::MissingRouteContainer => {
                write!(f, "a value must be specified for `route_container`")
            }
            CoordinatorError::RouteContainerNotFound(id) => {
                write!(f, "specified route container does not exist: `{id}`")
            }
            CoordinatorError::InvalidExtension(kind) => {
                write!(f, "invalid route extension: expected an object, got {kind}")
            }
            CoordinatorError::MissingSectionName => write!(f, "a section needs a name"),
            CoordinatorError::RoutesNotInitialized => {
                write!(f, "routes are not initialized yet")
            }
        }
    }
}

impl std::error::Error for CoordinatorError {}

// ============================================================================
// Lifecycle bookkeeping
// ============================================================================

/// Where the current navigation cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Resolving,
    TearingDown,
    ParentTransition,
    Initializing,
}

/// A route whose `init` reported an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFailure {
    pub section: String,
    pub route: String,
    pub message: String,
}

/// Snapshot published after every processed action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationStatus {
    /// Routing events processed, including ones that resolved to nothing.
    pub events_seen: u64,
    /// Navigation cycles started.
    pub cycle: u64,
    pub phase: LifecyclePhase,
    pub active_section: Option<String>,
    pub active_route: Option<String>,
    pub active_parent_section: Option<String>,
    pub last_failure: Option<InitFailure>,
}

/// The init that the current cycle is waiting on.
pub(crate) struct InFlight {
    pub cycle: u64,
    pub section: String,
    pub route: Arc<dyn Route>,
    pub route_id: Option<String>,
    pub ctx: LifecycleContext,
    pub task: Option<AbortHandle>,
}

impl InFlight {
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

pub struct Coordinator {
    pub(crate) route_container: String,
    pub(crate) debug: bool,
    pub(crate) renderer: Arc<dyn RenderPort>,
    pub(crate) intervals: Intervals,
    pub(crate) sections: HashMap<String, Arc<Section>>,
    pub(crate) active_section: Option<Arc<Section>>,
    pub(crate) active_route: Option<Arc<dyn Route>>,
    pub(crate) active_parent_section: Option<String>,
    pub(crate) route_extensions: Vec<RouteExtension>,
    pub(crate) routes_initialized: bool,
    pub(crate) phase: LifecyclePhase,
    pub(crate) events_seen: u64,
    pub(crate) cycle: u64,
    pub(crate) in_flight: Option<InFlight>,
    pub(crate) last_failure: Option<InitFailure>,
}

impl Coordinator {
    /// Validates the route container and builds an idle coordinator.
    pub fn new(
        options: CoordinatorOptions,
        renderer: Arc<dyn RenderPort>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, CoordinatorError> {
        let route_container = options
            .route_container
            .filter(|id| !id.trim().is_empty())
            .ok_or(CoordinatorError::MissingRouteContainer)?;
        if !renderer.has_element(&route_container) {
            return Err(CoordinatorError::RouteContainerNotFound(route_container));
        }
        info!("Coordinator bound to container '{}'", route_container);

        Ok(Self {
            route_container,
            debug: options.debug,
            renderer,
            intervals: Intervals::new(scheduler),
            sections: HashMap::new(),
            active_section: None,
            active_route: None,
            active_parent_section: None,
            route_extensions: Vec::new(),
            routes_initialized: false,
            phase: LifecyclePhase::Idle,
            events_seen: 0,
            cycle: 0,
            in_flight: None,
            last_failure: None,
        })
    }

    /// Registers a section. A section with the same name is replaced.
    pub fn create_section(
        &mut self,
        options: SectionOptions,
    ) -> Result<Arc<Section>, CoordinatorError> {
        if options.name.trim().is_empty() {
            return Err(CoordinatorError::MissingSectionName);
        }
        let section = Arc::new(Section::new(options));
        if self
            .sections
            .insert(section.name().to_string(), section.clone())
            .is_some()
        {
            debug!("Section '{}' re-registered, replacing previous", section.name());
        }
        Ok(section)
    }

    pub fn section(&self, name: &str) -> Option<Arc<Section>> {
        self.sections.get(name).cloned()
    }

    /// Appends a route extension. Only JSON objects are accepted.
    pub fn extend_routes(&mut self, extension: Value) -> Result<(), CoordinatorError> {
        let Value::Object(extension) = extension else {
            return Err(CoordinatorError::InvalidExtension(json_kind(&extension)));
        };
        if self.routes_initialized {
            warn!("Route extension registered after startup; the router will not see it");
        }
        self.route_extensions.push(extension);
        Ok(())
    }

    pub fn route_extensions(&self) -> &[RouteExtension] {
        &self.route_extensions
    }

    /// Marks startup as done. Returns false if it already happened.
    pub(crate) fn begin_routes(&mut self) -> bool {
        if self.routes_initialized {
            return false;
        }
        self.routes_initialized = true;
        true
    }

    pub fn routes_initialized(&self) -> bool {
        self.routes_initialized
    }

    pub fn get_template(&self, template_id: &str) -> Option<CompiledTemplate> {
        render::get_template(self.renderer.as_ref(), template_id)
    }

    pub fn insert_template(&self, markup: &str) {
        self.context().insert_template(markup);
    }

    /// Aborts the pending init and clears both interval scopes.
    pub(crate) fn shutdown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort();
        }
        let cleared = self.intervals.clear(IntervalScope::Section)
            + self.intervals.clear(IntervalScope::ParentSection);
        info!("Coordinator shut down, {} interval(s) cleared", cleared);
    }

    /// A context bound to the current interval generations.
    pub fn context(&self) -> LifecycleContext {
        LifecycleContext::new(
            self.intervals.clone(),
            self.renderer.clone(),
            self.route_container.clone(),
            self.debug,
        )
    }

    /// Remembers the task running the current cycle's init so a later
    /// navigation can abort it.
    pub(crate) fn track_init_task(&mut self, cycle: u64, task: AbortHandle) {
        match self.in_flight.as_mut() {
            Some(in_flight) if in_flight.cycle == cycle => in_flight.task = Some(task),
            // Superseded before it was even tracked
            _ => task.abort(),
        }
    }

    pub(crate) fn enter(&mut self, phase: LifecyclePhase) {
        if self.debug {
            debug!("Lifecycle {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
    }

    pub fn active_section(&self) -> Option<Arc<Section>> {
        self.active_section.clone()
    }

    pub fn active_route(&self) -> Option<Arc<dyn Route>> {
        self.active_route.clone()
    }

    pub fn active_parent_section(&self) -> Option<&str> {
        self.active_parent_section.as_deref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn last_init_failure(&self) -> Option<&InitFailure> {
        self.last_failure.as_ref()
    }

    pub fn intervals(&self) -> &Intervals {
        &self.intervals
    }

    pub fn status(&self) -> NavigationStatus {
        NavigationStatus {
            events_seen: self.events_seen,
            cycle: self.cycle,
            phase: self.phase,
            active_section: self.active_section.as_ref().map(|s| s.name().to_string()),
            active_route: self.active_route.as_ref().map(|r| r.name().to_string()),
            active_parent_section: self.active_parent_section.clone(),
            last_failure: self.last_failure.clone(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryDocument;
    use crate::test_support::{RecordingScheduler, test_coordinator};
    use serde_json::json;

    #[test]
    fn test_missing_route_container() {
        let doc = Arc::new(MemoryDocument::new().with_element("app", ""));
        let scheduler = Arc::new(RecordingScheduler::default());

        let err = Coordinator::new(CoordinatorOptions::default(), doc.clone(), scheduler.clone())
            .err()
            .unwrap();
        assert_eq!(err, CoordinatorError::MissingRouteContainer);

        let err = Coordinator::new(CoordinatorOptions::new("  "), doc, scheduler)
            .err()
            .unwrap();
        assert_eq!(err, CoordinatorError::MissingRouteContainer);
    }

    #[test]
    fn test_route_container_not_in_document() {
        let doc = Arc::new(MemoryDocument::new().with_element("app", ""));
        let err = Coordinator::new(
            CoordinatorOptions::new("main"),
            doc,
            Arc::new(RecordingScheduler::default()),
        )
        .err()
        .unwrap();

        assert_eq!(err, CoordinatorError::RouteContainerNotFound("main".to_string()));
        assert_eq!(err.to_string(), "specified route container does not exist: `main`");
    }

    #[test]
    fn test_new_coordinator_is_idle() {
        let (coordinator, _, _) = test_coordinator();
        assert!(coordinator.debug());
        assert_eq!(coordinator.phase(), LifecyclePhase::Idle);
        assert!(coordinator.active_section().is_none());
        assert!(coordinator.active_route().is_none());
        assert_eq!(coordinator.status(), NavigationStatus::default());
    }

    #[test]
    fn test_create_section_requires_name() {
        let (mut coordinator, _, _) = test_coordinator();
        let err = coordinator.create_section(SectionOptions::default()).unwrap_err();
        assert_eq!(err, CoordinatorError::MissingSectionName);
    }

    #[test]
    fn test_create_section_last_write_wins() {
        let (mut coordinator, _, _) = test_coordinator();
        coordinator
            .create_section(SectionOptions::new("dashboard"))
            .unwrap();
        coordinator
            .create_section(SectionOptions::new("dashboard").parent("root"))
            .unwrap();

        let section = coordinator.section("dashboard").unwrap();
        assert_eq!(section.parent_section(), Some("root"));
    }

    #[test]
    fn test_extend_routes_rejects_non_objects() {
        let (mut coordinator, _, _) = test_coordinator();
        for bad in [json!(null), json!("routes"), json!(3), json!([1, 2]), json!(true)] {
            assert!(matches!(
                coordinator.extend_routes(bad),
                Err(CoordinatorError::InvalidExtension(_))
            ));
        }
        assert!(coordinator.route_extensions().is_empty());
    }

    #[test]
    fn test_extend_routes_keeps_order() {
        let (mut coordinator, _, _) = test_coordinator();
        coordinator.extend_routes(json!({"order": 1})).unwrap();
        coordinator.extend_routes(json!({"order": 2})).unwrap();

        let orders: Vec<_> = coordinator
            .route_extensions()
            .iter()
            .map(|e| e["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_begin_routes_only_once() {
        let (mut coordinator, _, _) = test_coordinator();
        assert!(coordinator.begin_routes());
        assert!(!coordinator.begin_routes());
        assert!(coordinator.routes_initialized());
    }

    #[test]
    fn test_coordinator_template_and_insert() {
        let (coordinator, doc, _) = test_coordinator();
        doc.insert_element("rtpl_greeting", "Hello {{name}}");

        let template = coordinator.get_template("greeting").unwrap();
        coordinator.insert_template(&template.render(&json!({"name": "Ada"})).unwrap());

        assert_eq!(doc.content("app").as_deref(), Some("Hello Ada"));
        assert!(coordinator.get_template("missing").is_none());
    }
}
