//! # Router Port
//!
//! The router turns navigation requests into [`RouteEvent`]s. The
//! coordinator subscribes once (through [`Router::listen`]) and from then on
//! only sees events; it never inspects paths itself.

mod path;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::core::action::Action;

pub use path::PathRouter;

/// A caller-supplied configuration object consumed when the router is built.
pub type RouteExtension = Map<String, Value>;

/// Builds the router from the extensions registered so far.
pub type RouterFactory = Box<dyn FnOnce(&[RouteExtension]) -> Box<dyn Router> + Send>;

/// Payload of the routing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEvent {
    pub section_name: String,
    #[serde(default)]
    pub route_name: Option<String>,
    #[serde(default)]
    pub route_id: Option<String>,
}

impl RouteEvent {
    pub fn section(section_name: impl Into<String>) -> Self {
        Self {
            section_name: section_name.into(),
            route_name: None,
            route_id: None,
        }
    }

    pub fn route(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = Some(route_name.into());
        self
    }

    pub fn id(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigateOptions {
    /// Emit the routing event for the new path.
    pub trigger: bool,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

/// Subscription handed to [`Router::listen`].
#[derive(Clone)]
pub struct RouteEventSink {
    tx: UnboundedSender<Action>,
}

impl RouteEventSink {
    pub(crate) fn new(tx: UnboundedSender<Action>) -> Self {
        Self { tx }
    }

    /// Queues an event for the coordinator. Returns false once the
    /// coordinator is gone.
    pub fn emit(&self, event: RouteEvent) -> bool {
        if self.tx.send(Action::Route(event)).is_err() {
            warn!("Routing event dropped: coordinator stopped");
            return false;
        }
        true
    }
}

pub trait Router: Send {
    /// Starts dispatching routing events to `sink`.
    fn listen(&mut self, sink: RouteEventSink);

    fn navigate(&mut self, path: &str, options: NavigateOptions);
}
