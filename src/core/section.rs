//! # Sections
//!
//! A section groups routes under one name and may declare a parent section.
//! Sections are created through the coordinator and live as long as it does.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::core::context::LifecycleContext;
use crate::core::route::Route;

/// Invoked when a section becomes the active parent.
pub type SectionCallback = Arc<dyn Fn(&LifecycleContext) + Send + Sync>;

/// Invoked when a section is torn down.
pub type CleanupHook = Arc<dyn Fn() + Send + Sync>;

/// Options accepted by `create_section`.
#[derive(Clone, Default)]
pub struct SectionOptions {
    pub name: String,
    pub parent: Option<String>,
    pub default_route: Option<String>,
    pub callback: Option<SectionCallback>,
    pub on_cleanup: Option<CleanupHook>,
}

impl SectionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = Some(route.into());
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LifecycleContext) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn on_cleanup<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_cleanup = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for SectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionOptions")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("default_route", &self.default_route)
            .finish_non_exhaustive()
    }
}

pub struct Section {
    name: String,
    parent: Option<String>,
    default_route: RwLock<Option<String>>,
    routes: RwLock<Vec<Arc<dyn Route>>>,
    callback: Option<SectionCallback>,
    on_cleanup: Option<CleanupHook>,
}

impl Section {
    /// Builds a section. The name is assumed valid; the coordinator checks it.
    pub(crate) fn new(options: SectionOptions) -> Self {
        Self {
            name: options.name,
            // "" means no parent
            parent: options.parent.filter(|p| !p.is_empty()),
            default_route: RwLock::new(options.default_route),
            routes: RwLock::new(Vec::new()),
            callback: options.callback,
            on_cleanup: options.on_cleanup,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_section(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Adds a route, replacing any route with the same name in place.
    pub fn add_route(&self, route: Arc<dyn Route>) -> &Self {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes.iter_mut().find(|r| r.name() == route.name()) {
            Some(existing) => {
                debug!("Section '{}': replacing route '{}'", self.name, route.name());
                *existing = route;
            }
            None => routes.push(route),
        }
        self
    }

    pub fn route(&self, name: &str) -> Option<Arc<dyn Route>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    /// The configured default route, or the first route added.
    pub fn default_route(&self) -> Option<Arc<dyn Route>> {
        let configured = self
            .default_route
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match configured {
            Some(name) => self.route(&name),
            None => self
                .routes
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .first()
                .cloned(),
        }
    }

    pub fn set_default_route(&self, name: impl Into<String>) {
        *self.default_route.write().unwrap_or_else(PoisonError::into_inner) = Some(name.into());
    }

    /// Route names in registration order.
    pub fn route_names(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Runs the parent callback, if any.
    pub fn run_callback(&self, ctx: &LifecycleContext) {
        if let Some(callback) = &self.callback {
            callback(ctx);
        }
    }

    pub fn cleanup(&self) {
        debug!("Section '{}' cleanup", self.name);
        if let Some(hook) = &self.on_cleanup {
            hook();
        }
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("routes", &self.route_names())
            .finish_non_exhaustive()
    }
}
