//! # Routes
//!
//! A route is one navigable unit inside a section. The coordinator drives
//! it through three hooks:
//!
//! ```text
//! init(ctx).await ──Ok──► init_route(ctx, route_id)      (route is live)
//!        │
//!        └──Err──► recorded as an InitFailure, init_route is skipped
//!
//! cleanup()   when the route stops being active
//! ```

use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::json;

use crate::core::context::LifecycleContext;
use crate::render::CompiledTemplate;

/// Failure reported by a route's `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteError {
    message: String,
}

impl RouteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route init failed: {}", self.message)
    }
}

impl std::error::Error for RouteError {}

impl From<String> for RouteError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for RouteError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[async_trait]
pub trait Route: Send + Sync {
    /// Name of the route, unique within its section.
    fn name(&self) -> &str;

    /// Prepares the route. May complete on a later turn of the event loop.
    async fn init(&self, ctx: LifecycleContext) -> Result<(), RouteError>;

    /// Activates the route once `init` succeeded.
    fn init_route(&self, ctx: &LifecycleContext, route_id: Option<&str>);

    /// Tears the route down. May be called on a route whose init failed.
    fn cleanup(&self) {}
}

// ============================================================================
// Template route
// ============================================================================

/// Route that renders one template into the route container.
///
/// The template receives `route` (the route name) and `route_id`.
pub struct TemplateRoute {
    name: String,
    template_id: String,
    compiled: Mutex<Option<CompiledTemplate>>,
}

impl TemplateRoute {
    pub fn new(name: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_id: template_id.into(),
            compiled: Mutex::new(None),
        }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }
}

#[async_trait]
impl Route for TemplateRoute {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: LifecycleContext) -> Result<(), RouteError> {
        let template = ctx.get_template(&self.template_id).ok_or_else(|| {
            RouteError::new(format!("template '{}' is not available", self.template_id))
        })?;
        *self.compiled.lock().unwrap_or_else(PoisonError::into_inner) = Some(template);
        Ok(())
    }

    fn init_route(&self, ctx: &LifecycleContext, route_id: Option<&str>) {
        let compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(template) = compiled.as_ref() else {
            warn!("Route '{}' activated before init", self.name);
            return;
        };
        match template.render(&json!({ "route": self.name, "route_id": route_id })) {
            Ok(markup) => ctx.insert_template(&markup),
            Err(e) => warn!("Route '{}' failed to render: {}", self.name, e),
        }
    }

    fn cleanup(&self) {
        debug!("Route '{}' cleaned up", self.name);
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interval::Intervals;
    use crate::render::MemoryDocument;
    use crate::test_support::RecordingScheduler;
    use std::sync::Arc;

    fn context(doc: Arc<MemoryDocument>) -> LifecycleContext {
        let intervals = Intervals::new(Arc::new(RecordingScheduler::default()));
        LifecycleContext::new(intervals, doc, "app".to_string(), false)
    }

    #[test]
    fn test_template_route_renders_into_container() {
        let doc = Arc::new(
            MemoryDocument::new()
                .with_element("app", "")
                .with_element("rtpl_detail", "{{route}}:{{route_id}}"),
        );
        let ctx = context(doc.clone());
        let route = TemplateRoute::new("detail", "detail");

        tokio_test::block_on(route.init(ctx.clone())).unwrap();
        route.init_route(&ctx, Some("42"));

        assert_eq!(doc.content("app").as_deref(), Some("detail:42"));
    }

    #[test]
    fn test_template_route_missing_template_fails_init() {
        let doc = Arc::new(MemoryDocument::new().with_element("app", "untouched"));
        let ctx = context(doc.clone());
        let route = TemplateRoute::new("detail", "nope");

        let err = tokio_test::block_on(route.init(ctx.clone())).unwrap_err();
        assert!(err.message().contains("nope"));

        // Activation without a template leaves the container alone
        route.init_route(&ctx, None);
        assert_eq!(doc.content("app").as_deref(), Some("untouched"));
    }

    #[test]
    fn test_cleanup_drops_compiled_template() {
        let doc = Arc::new(
            MemoryDocument::new()
                .with_element("app", "")
                .with_element("rtpl_home", "home"),
        );
        let ctx = context(doc.clone());
        let route = TemplateRoute::new("home", "home");

        tokio_test::block_on(route.init(ctx.clone())).unwrap();
        route.cleanup();
        route.init_route(&ctx, None);

        assert_eq!(doc.content("app").as_deref(), Some(""));
    }

    #[test]
    fn test_route_error_display() {
        let err = RouteError::from("backend down");
        assert_eq!(err.to_string(), "route init failed: backend down");
    }
}
