//! # Actions
//!
//! Everything that can happen to the coordinator becomes an `Action`.
//! The router emits `Action::Route`. A finished route init comes back as
//! `Action::RouteInitialized`.
//!
//! `update()` applies an action synchronously and returns an `Effect`
//! telling the driver what async work to start. No spawning happens here.
//!
//! ```text
//! Coordinator + Action  →  update()  →  Effect
//! ```
//!
//! One navigation cycle:
//!
//! ```text
//! Resolving         section + route lookup, misses end the cycle silently
//! TearingDown       abort stale init, clear section intervals,
//!                   cleanup previous route, cleanup previous section
//! ParentTransition  swap the parent scope if the declared parent changed
//! Initializing      Effect::InitRoute, wait for RouteInitialized
//! Idle              init_route on success, InitFailure on error
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, info, warn};

use crate::core::context::LifecycleContext;
use crate::core::interval::IntervalScope;
use crate::core::route::{Route, RouteError};
use crate::core::section::Section;
use crate::core::state::{Coordinator, InFlight, InitFailure, LifecyclePhase};
use crate::router::RouteEvent;

#[derive(Debug)]
pub enum Action {
    /// The router resolved a navigation.
    Route(RouteEvent),
    /// A route init finished for the given cycle.
    RouteInitialized {
        cycle: u64,
        result: Result<(), RouteError>,
    },
}

/// Async work requested by `update()`.
pub enum Effect {
    None,
    InitRoute(RouteInit),
}

impl Effect {
    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "None"),
            Effect::InitRoute(init) => {
                write!(f, "InitRoute({}, cycle {})", init.route.name(), init.cycle)
            }
        }
    }
}

/// A route init that the driver must run and report back.
pub struct RouteInit {
    pub cycle: u64,
    pub route: Arc<dyn Route>,
    pub ctx: LifecycleContext,
}

impl RouteInit {
    /// Runs the route's `init` and turns the outcome into the action to feed
    /// back. A panic inside `init` counts as a failure.
    pub async fn run(self) -> Action {
        let RouteInit { cycle, route, ctx } = self;
        let result = match AssertUnwindSafe(route.init(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(RouteError::new(format!(
                "route '{}' panicked during init",
                route.name()
            ))),
        };
        Action::RouteInitialized { cycle, result }
    }
}

pub fn update(coordinator: &mut Coordinator, action: Action) -> Effect {
    match action {
        Action::Route(event) => on_route(coordinator, event),
        Action::RouteInitialized { cycle, result } => {
            on_route_initialized(coordinator, cycle, result);
            Effect::None
        }
    }
}

fn on_route(coordinator: &mut Coordinator, event: RouteEvent) -> Effect {
    coordinator.events_seen += 1;
    if coordinator.debug {
        debug!("onRoute {:?}", event);
    }

    // Misses are not ours to handle; other listeners may share the router.
    let Some(section) = coordinator.section(&event.section_name) else {
        if coordinator.debug {
            debug!("No section '{}', ignoring", event.section_name);
        }
        return Effect::None;
    };
    let route = match event.route_name.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => section.route(name),
        None => section.default_route(),
    };
    let Some(route) = route else {
        if coordinator.debug {
            debug!(
                "Section '{}' has no route {:?}, ignoring",
                section.name(),
                event.route_name
            );
        }
        return Effect::None;
    };

    coordinator.enter(LifecyclePhase::Resolving);
    coordinator.enter(LifecyclePhase::TearingDown);
    if let Some(stale) = coordinator.in_flight.take() {
        stale.abort();
        debug!(
            "Superseded init of '{}/{}' (cycle {})",
            stale.section,
            stale.route.name(),
            stale.cycle
        );
    }
    coordinator.intervals.clear(IntervalScope::Section);
    if let Some(previous) = coordinator.active_route.take() {
        previous.cleanup();
    }
    if let Some(previous) = coordinator.active_section.take()
        && previous.name() != section.name()
    {
        previous.cleanup();
    }

    coordinator.enter(LifecyclePhase::ParentTransition);
    check_parent_section(coordinator, &section);

    coordinator.active_section = Some(section.clone());
    coordinator.active_route = Some(route.clone());

    coordinator.enter(LifecyclePhase::Initializing);
    coordinator.cycle += 1;
    let cycle = coordinator.cycle;
    let ctx = coordinator.context();
    coordinator.in_flight = Some(InFlight {
        cycle,
        section: section.name().to_string(),
        route: route.clone(),
        route_id: event.route_id,
        ctx: ctx.clone(),
        task: None,
    });
    info!("Navigating to '{}/{}' (cycle {})", section.name(), route.name(), cycle);

    Effect::InitRoute(RouteInit { cycle, route, ctx })
}

fn check_parent_section(coordinator: &mut Coordinator, section: &Section) {
    let Some(parent_name) = section.parent_section() else {
        coordinator.active_parent_section = None;
        coordinator.intervals.clear(IntervalScope::ParentSection);
        return;
    };
    if coordinator.active_parent_section.as_deref() == Some(parent_name) {
        return;
    }

    if let Some(previous) = coordinator.active_parent_section.take() {
        match coordinator.section(&previous) {
            Some(previous) => previous.cleanup(),
            None => warn!("Previous parent section '{}' is not registered", previous),
        }
    }
    coordinator.intervals.clear(IntervalScope::ParentSection);

    coordinator.active_parent_section = Some(parent_name.to_string());
    match coordinator.section(parent_name) {
        Some(parent) => {
            debug!("Parent section is now '{}'", parent_name);
            parent.run_callback(&coordinator.context());
        }
        None => warn!(
            "Section '{}' declares unknown parent '{}'",
            section.name(),
            parent_name
        ),
    }
}

fn on_route_initialized(coordinator: &mut Coordinator, cycle: u64, result: Result<(), RouteError>) {
    let current = coordinator
        .in_flight
        .as_ref()
        .is_some_and(|in_flight| in_flight.cycle == cycle);
    if !current {
        debug!("Discarding init result of superseded cycle {}", cycle);
        return;
    }
    let Some(in_flight) = coordinator.in_flight.take() else {
        return;
    };
    coordinator.enter(LifecyclePhase::Idle);

    match result {
        Ok(()) => {
            coordinator.last_failure = None;
            in_flight
                .route
                .init_route(&in_flight.ctx, in_flight.route_id.as_deref());
            info!("Route '{}/{}' is live", in_flight.section, in_flight.route.name());
        }
        Err(e) => {
            warn!(
                "Route '{}/{}' failed to initialize: {}",
                in_flight.section,
                in_flight.route.name(),
                e
            );
            coordinator.last_failure = Some(InitFailure {
                section: in_flight.section,
                route: in_flight.route.name().to_string(),
                message: e.message().to_string(),
            });
        }
    }
}
