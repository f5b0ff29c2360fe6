//! # Lifecycle Context
//!
//! The capabilities a section or route gets while it is being set up:
//! scoped intervals, template lookup and the route container.
//!
//! A context remembers the interval generations that were current when it
//! was created, so a context that outlives its navigation cycle can no
//! longer register timers.

use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::core::interval::{IntervalId, IntervalScope, Intervals};
use crate::render::{self, CompiledTemplate, RenderPort};

#[derive(Clone)]
pub struct LifecycleContext {
    intervals: Intervals,
    section_generation: u64,
    parent_generation: u64,
    renderer: Arc<dyn RenderPort>,
    route_container: String,
    debug: bool,
}

impl LifecycleContext {
    pub(crate) fn new(
        intervals: Intervals,
        renderer: Arc<dyn RenderPort>,
        route_container: String,
        debug: bool,
    ) -> Self {
        Self {
            section_generation: intervals.generation(IntervalScope::Section),
            parent_generation: intervals.generation(IntervalScope::ParentSection),
            intervals,
            renderer,
            route_container,
            debug,
        }
    }

    /// Runs `task` every `period` until the active section changes.
    ///
    /// Returns `None` if this context's navigation cycle is already over.
    pub fn create_section_interval<F>(&self, task: F, period: Duration) -> Option<IntervalId>
    where
        F: FnMut() + Send + 'static,
    {
        self.intervals.create_in(
            IntervalScope::Section,
            self.section_generation,
            Box::new(task),
            period,
        )
    }

    /// Runs `task` every `period` until the active parent section changes.
    pub fn create_parent_section_interval<F>(&self, task: F, period: Duration) -> Option<IntervalId>
    where
        F: FnMut() + Send + 'static,
    {
        self.intervals.create_in(
            IntervalScope::ParentSection,
            self.parent_generation,
            Box::new(task),
            period,
        )
    }

    pub fn get_template(&self, template_id: &str) -> Option<CompiledTemplate> {
        render::get_template(self.renderer.as_ref(), template_id)
    }

    /// Replaces the route container's content.
    pub fn insert_template(&self, markup: &str) {
        if !self.renderer.set_content(&self.route_container, markup) {
            warn!("Route container '{}' disappeared", self.route_container);
        }
    }

    pub fn route_container(&self) -> &str {
        &self.route_container
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryDocument;
    use crate::test_support::RecordingScheduler;

    fn context(intervals: &Intervals, doc: Arc<MemoryDocument>) -> LifecycleContext {
        LifecycleContext::new(intervals.clone(), doc, "app".to_string(), true)
    }

    #[test]
    fn test_context_intervals_land_in_their_scope() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let intervals = Intervals::new(scheduler);
        let ctx = context(&intervals, Arc::new(MemoryDocument::new()));

        let section = ctx.create_section_interval(|| {}, Duration::from_millis(50));
        let parent = ctx.create_parent_section_interval(|| {}, Duration::from_millis(50));

        assert_eq!(intervals.active(IntervalScope::Section), vec![section.unwrap()]);
        assert_eq!(intervals.active(IntervalScope::ParentSection), vec![parent.unwrap()]);
    }

    #[test]
    fn test_context_outliving_its_cycle() {
        let scheduler = Arc::new(RecordingScheduler::default());
        let intervals = Intervals::new(scheduler.clone());
        let ctx = context(&intervals, Arc::new(MemoryDocument::new()));

        intervals.clear(IntervalScope::Section);

        assert!(ctx.create_section_interval(|| {}, Duration::from_millis(50)).is_none());
        // Parent scope was not cleared, so it still accepts
        assert!(ctx.create_parent_section_interval(|| {}, Duration::from_millis(50)).is_some());
        assert_eq!(scheduler.started(), 1);
    }

    #[test]
    fn test_insert_template_writes_container() {
        let doc = Arc::new(MemoryDocument::new().with_element("app", ""));
        let intervals = Intervals::new(Arc::new(RecordingScheduler::default()));
        let ctx = context(&intervals, doc.clone());

        ctx.insert_template("<p>hi</p>");

        assert_eq!(doc.content("app").as_deref(), Some("<p>hi</p>"));
        assert_eq!(ctx.route_container(), "app");
    }
}
