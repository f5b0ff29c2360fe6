//! In-memory document: a flat list of `(id, markup)` elements.
//!
//! Ids are not forced to be unique, so ambiguous template lookups can be
//! represented the same way a sloppy page would.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use log::{debug, info};

use super::RenderPort;

const TEMPLATE_EXTENSIONS: &[&str] = &["html", "hbs", "handlebars"];

#[derive(Default)]
pub struct MemoryDocument {
    elements: RwLock<Vec<(String, String)>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert_element`](Self::insert_element).
    pub fn with_element(self, id: &str, markup: &str) -> Self {
        self.insert_element(id, markup);
        self
    }

    /// Appends an element. An existing element with the same id is kept.
    pub fn insert_element(&self, id: &str, markup: &str) {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.to_string(), markup.to_string()));
    }

    /// Content of the first element with the given id.
    pub fn content(&self, id: &str) -> Option<String> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(element_id, _)| element_id == id)
            .map(|(_, markup)| markup.clone())
    }

    /// Builds a document from a directory of template files plus an empty
    /// container element.
    ///
    /// Every `*.html`, `*.hbs` or `*.handlebars` file becomes an element whose
    /// id is the file stem, so `rtpl_home.hbs` backs the `home` template.
    pub fn from_dir(dir: &Path, container_id: &str) -> io::Result<Self> {
        let document = Self::new().with_element(container_id, "");

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
            })
            .collect();
        paths.sort();

        for path in &paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let markup = fs::read_to_string(path)?;
            debug!("Loaded element '{}' from {}", id, path.display());
            document.insert_element(id, &markup);
        }
        info!("Loaded {} element(s) from {}", paths.len(), dir.display());
        Ok(document)
    }
}

impl RenderPort for MemoryDocument {
    fn find_elements(&self, id: &str) -> Vec<String> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(element_id, _)| element_id == id)
            .map(|(_, markup)| markup.clone())
            .collect()
    }

    fn set_content(&self, id: &str, markup: &str) -> bool {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        match elements.iter_mut().find(|(element_id, _)| element_id == id) {
            Some((_, content)) => {
                *content = markup.to_string();
                true
            }
            None => false,
        }
    }
}
