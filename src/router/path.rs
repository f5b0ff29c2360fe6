//! Path router: `section[/route[/id...]]`.
//!
//! No pattern syntax. Route extensions may declare exact-path aliases:
//!
//! ```json
//! { "routes": { "": "dashboard", "me": "settings/profile/self" } }
//! ```
//!
//! Later extensions win over earlier ones for the same alias.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::{NavigateOptions, RouteEvent, RouteEventSink, RouteExtension, Router};

pub struct PathRouter {
    aliases: HashMap<String, String>,
    history: Vec<String>,
    start_path: Option<String>,
    sink: Option<RouteEventSink>,
}

impl PathRouter {
    pub fn new(extensions: &[RouteExtension]) -> Self {
        let mut aliases = HashMap::new();
        for extension in extensions {
            let Some(routes) = extension.get("routes") else {
                continue;
            };
            let Some(routes) = routes.as_object() else {
                warn!("Ignoring route extension: `routes` is not an object");
                continue;
            };
            for (alias, target) in routes {
                match target.as_str() {
                    Some(target) => {
                        aliases.insert(normalize(alias), normalize(target));
                    }
                    None => warn!("Ignoring route alias '{}': target is not a string", alias),
                }
            }
        }
        debug!("Path router built with {} alias(es)", aliases.len());
        Self {
            aliases,
            history: Vec::new(),
            start_path: None,
            sink: None,
        }
    }

    /// Path to dispatch as soon as `listen` is called.
    pub fn with_start_path(mut self, path: impl Into<String>) -> Self {
        self.start_path = Some(path.into());
        self
    }

    /// Maps a path to the routing event it would emit.
    pub fn resolve(&self, path: &str) -> Option<RouteEvent> {
        let normalized = normalize(path);
        let target = self.aliases.get(&normalized).unwrap_or(&normalized);

        let mut segments = target.split('/').filter(|s| !s.is_empty());
        let section_name = segments.next()?;
        let route_name = segments.next().map(str::to_string);
        let rest: Vec<&str> = segments.collect();
        let route_id = (!rest.is_empty()).then(|| rest.join("/"));

        Some(RouteEvent {
            section_name: section_name.to_string(),
            route_name,
            route_id,
        })
    }

    /// Visited paths, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn dispatch(&self, path: &str) {
        let Some(sink) = &self.sink else {
            debug!("Not listening yet, '{}' not dispatched", path);
            return;
        };
        match self.resolve(path) {
            Some(event) => {
                sink.emit(event);
            }
            None => debug!("No section in path '{}'", path),
        }
    }
}

impl Router for PathRouter {
    fn listen(&mut self, sink: RouteEventSink) {
        self.sink = Some(sink);
        info!("Path router listening");
        if let Some(start) = self.start_path.clone() {
            self.navigate(&start, NavigateOptions { trigger: true, replace: true });
        }
    }

    fn navigate(&mut self, path: &str, options: NavigateOptions) {
        let normalized = normalize(path);
        match self.history.last_mut() {
            Some(top) if options.replace => *top = normalized,
            _ => self.history.push(normalized),
        }
        if options.trigger {
            self.dispatch(path);
        }
    }
}

/// Strips a leading `#`, any query or fragment, and surrounding slashes.
fn normalize(path: &str) -> String {
    let path = path.trim().trim_start_matches('#');
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.trim_matches('/').to_string()
}
