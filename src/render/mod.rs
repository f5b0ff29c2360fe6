//! # Rendering Port
//!
//! Everything the coordinator needs from a document: finding elements by id
//! and replacing the route container's content. Keeping it behind a trait
//! lets the lifecycle core run without a real document.
//!
//! Templates live in elements named `rtpl_<id>` and use Handlebars syntax.

mod document;

use std::fmt;
use std::sync::Arc;

use handlebars::Handlebars;
use log::debug;
use serde::Serialize;

pub use document::MemoryDocument;

/// Element-id prefix used for template lookup.
pub const TEMPLATE_PREFIX: &str = "rtpl_";

/// The document as seen by the coordinator.
pub trait RenderPort: Send + Sync {
    /// Markup of every element with the given id, in document order.
    fn find_elements(&self, id: &str) -> Vec<String>;

    /// Replaces the content of the element with the given id.
    /// Returns false if there is no such element.
    fn set_content(&self, id: &str, markup: &str) -> bool;

    fn has_element(&self, id: &str) -> bool {
        !self.find_elements(id).is_empty()
    }
}

/// A template that compiled successfully and can be rendered repeatedly.
#[derive(Clone)]
pub struct CompiledTemplate {
    name: String,
    registry: Arc<Handlebars<'static>>,
}

impl CompiledTemplate {
    /// Compiles `source`, returning the parse error on malformed input.
    pub fn compile(name: &str, source: &str) -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(name, source)?;
        Ok(Self {
            name: name.to_string(),
            registry: Arc::new(registry),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, handlebars::RenderError> {
        self.registry.render(&self.name, data)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .finish()
    }
}

/// Looks up `rtpl_<template_id>` and compiles it.
///
/// Returns `None` when the id is empty, when there isn't exactly one
/// matching element, or when the markup does not compile.
pub fn get_template(port: &dyn RenderPort, template_id: &str) -> Option<CompiledTemplate> {
    if template_id.trim().is_empty() {
        return None;
    }
    let element_id = format!("{TEMPLATE_PREFIX}{template_id}");
    let mut matches = port.find_elements(&element_id);
    if matches.len() != 1 {
        debug!(
            "Template '{}' unavailable: {} matching element(s)",
            element_id,
            matches.len()
        );
        return None;
    }
    let source = matches.remove(0);
    match CompiledTemplate::compile(template_id, &source) {
        Ok(template) => Some(template),
        Err(e) => {
            debug!("Template '{}' failed to compile: {}", element_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_template_renders() {
        let doc = MemoryDocument::new().with_element("rtpl_home", "<h1>{{title}}</h1>");
        let template = get_template(&doc, "home").expect("template should compile");
        assert_eq!(template.name(), "home");
        assert_eq!(
            template.render(&json!({"title": "Welcome"})).unwrap(),
            "<h1>Welcome</h1>"
        );
    }

    #[test]
    fn test_get_template_empty_id() {
        let doc = MemoryDocument::new().with_element("rtpl_", "oops");
        assert!(get_template(&doc, "").is_none());
    }

    #[test]
    fn test_get_template_missing() {
        let doc = MemoryDocument::new().with_element("home", "no prefix");
        assert!(get_template(&doc, "home").is_none());
    }

    #[test]
    fn test_get_template_ambiguous() {
        let doc = MemoryDocument::new()
            .with_element("rtpl_list", "<ul></ul>")
            .with_element("rtpl_list", "<ol></ol>");
        assert!(get_template(&doc, "list").is_none());
    }

    #[test]
    fn test_get_template_malformed() {
        let doc = MemoryDocument::new().with_element("rtpl_broken", "{{#if ready}}never closed");
        assert!(get_template(&doc, "broken").is_none());
    }
}
