//! # Runtime
//!
//! Wires the coordinator to Tokio. [`Edison`] is the public face: it exposes
//! section creation, route startup, route extensions, navigation and a few
//! accessors, and keeps the richer [`Coordinator`] behind a lock.
//!
//! ## Event loop
//!
//! `init_routes` spawns one task that drains the action channel:
//!
//! - Router events and init results arrive as [`Action`]s.
//! - Each action goes through `update()` while the coordinator is locked.
//! - `Effect::InitRoute` spawns the route's `init`; its abort handle is kept
//!   so the next navigation can cancel it.
//! - After every action a [`NavigationStatus`] snapshot is published on a
//!   watch channel.
//!
//! The loop only holds a weak reference. Dropping the last `Edison` aborts
//! the pending init, clears every interval and lets the loop end.
//!
//! The coordinator lock is held while section and route hooks run, so hooks
//! must use their [`LifecycleContext`](crate::core::context::LifecycleContext)
//! rather than this facade. `navigate` is the exception: it only touches the
//! router, and the event it produces is queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

use crate::core::action::{Action, Effect, update};
use crate::core::interval::Scheduler;
use crate::core::route::Route;
use crate::core::section::{Section, SectionOptions};
use crate::core::state::{Coordinator, CoordinatorError, CoordinatorOptions, NavigationStatus};
use crate::render::RenderPort;
use crate::router::{NavigateOptions, RouteEventSink, RouteExtension, Router, RouterFactory};

/// The pieces the coordinator talks to but does not own the logic of.
pub struct Collaborators {
    pub renderer: Arc<dyn RenderPort>,
    pub scheduler: Arc<dyn Scheduler>,
    pub router_factory: RouterFactory,
}

struct Shared {
    coordinator: Mutex<Coordinator>,
    router: Mutex<Option<Box<dyn Router>>>,
    router_factory: Mutex<Option<RouterFactory>>,
    actions: UnboundedSender<Action>,
    inbox: Mutex<Option<UnboundedReceiver<Action>>>,
    status: watch::Sender<NavigationStatus>,
}

impl Shared {
    fn coordinator(&self) -> MutexGuard<'_, Coordinator> {
        self.coordinator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.coordinator
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown();
    }
}

#[derive(Clone)]
pub struct Edison {
    shared: Arc<Shared>,
}

impl Edison {
    /// Fails if the route container is missing or not in the document.
    pub fn new(
        options: CoordinatorOptions,
        collaborators: Collaborators,
    ) -> Result<Self, CoordinatorError> {
        let Collaborators {
            renderer,
            scheduler,
            router_factory,
        } = collaborators;
        let coordinator = Coordinator::new(options, renderer, scheduler)?;
        let (actions, inbox) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(coordinator.status());

        Ok(Self {
            shared: Arc::new(Shared {
                coordinator: Mutex::new(coordinator),
                router: Mutex::new(None),
                router_factory: Mutex::new(Some(router_factory)),
                actions,
                inbox: Mutex::new(Some(inbox)),
                status,
            }),
        })
    }

    pub fn create_section(
        &self,
        options: SectionOptions,
    ) -> Result<Arc<Section>, CoordinatorError> {
        self.shared.coordinator().create_section(options)
    }

    /// Builds the router, starts the event loop and begins listening.
    /// Later calls do nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init_routes(&self) {
        info!("Initializing routes...");
        let extensions: Vec<RouteExtension> = {
            let mut coordinator = self.shared.coordinator();
            if !coordinator.begin_routes() {
                debug!("Routes already initialized");
                return;
            }
            coordinator.route_extensions().to_vec()
        };
        let factory = self
            .shared
            .router_factory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let inbox = self
            .shared
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let (Some(factory), Some(inbox)) = (factory, inbox) else {
            warn!("Router already consumed, not starting again");
            return;
        };

        tokio::spawn(event_loop(Arc::downgrade(&self.shared), inbox));

        // Held through listen() so a hook navigating early waits for the router.
        let mut slot = self.shared.router.lock().unwrap_or_else(PoisonError::into_inner);
        let router = slot.insert(factory(&extensions));
        router.listen(RouteEventSink::new(self.shared.actions.clone()));
        info!("Routes initialized with {} extension(s)", extensions.len());
    }

    /// Registers a route extension. Must be a JSON object.
    pub fn extend_routes(&self, extension: Value) -> Result<(), CoordinatorError> {
        self.shared.coordinator().extend_routes(extension)
    }

    /// Navigates to `path`, replacing the current history entry when
    /// `replace_history` is set.
    pub fn navigate(&self, path: &str, replace_history: bool) -> Result<(), CoordinatorError> {
        let mut router = self.shared.router.lock().unwrap_or_else(PoisonError::into_inner);
        let router = router.as_mut().ok_or(CoordinatorError::RoutesNotInitialized)?;
        router.navigate(
            path,
            NavigateOptions {
                trigger: true,
                replace: replace_history,
            },
        );
        Ok(())
    }

    pub fn active_section(&self) -> Option<Arc<Section>> {
        self.shared.coordinator().active_section()
    }

    pub fn active_route(&self) -> Option<Arc<dyn Route>> {
        self.shared.coordinator().active_route()
    }

    pub fn debug(&self) -> bool {
        self.shared.coordinator().debug()
    }

    pub fn route_extensions(&self) -> Vec<RouteExtension> {
        self.shared.coordinator().route_extensions().to_vec()
    }

    /// Status updates, one per processed action.
    pub fn status(&self) -> watch::Receiver<NavigationStatus> {
        self.shared.status.subscribe()
    }
}

/// Runs until every `Edison` handle is gone and the last sender is dropped.
async fn event_loop(handle: Weak<Shared>, mut inbox: UnboundedReceiver<Action>) {
    info!("Event loop started");
    while let Some(action) = inbox.recv().await {
        let Some(shared) = handle.upgrade() else {
            break;
        };
        debug!("Event loop received: {:?}", action);
        let status = {
            let mut coordinator = shared.coordinator();
            if let Effect::InitRoute(init) = update(&mut coordinator, action) {
                let cycle = init.cycle;
                let tx = shared.actions.clone();
                let task = tokio::spawn(async move {
                    let action = init.run().await;
                    if tx.send(action).is_err() {
                        warn!("Init result for cycle {} dropped: event loop stopped", cycle);
                    }
                });
                coordinator.track_init_task(cycle, task.abort_handle());
            }
            coordinator.status()
        };
        shared.status.send_replace(status);
    }
    info!("Event loop stopped");
}
