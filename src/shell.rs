//! # Shell Adapter
//!
//! Line-oriented driver for the binary. Builds an [`Edison`] from the
//! resolved config, then reads paths from stdin and prints what the route
//! container holds after each navigation settles.
//!
//! ```text
//! > dashboard            navigate, push history
//! > !settings/profile    navigate, replace history
//! > status               print the current NavigationStatus
//! > quit                 exit
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::core::config::{ResolvedConfig, SectionEntry};
use crate::core::interval::TokioScheduler;
use crate::core::route::TemplateRoute;
use crate::core::section::SectionOptions;
use crate::core::state::{CoordinatorOptions, LifecyclePhase, NavigationStatus};
use crate::render::MemoryDocument;
use crate::router::{PathRouter, RouteExtension, Router};
use crate::runtime::{Collaborators, Edison};

/// How long to wait for a navigation to settle before giving up on it.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Navigate { path: String, replace: bool },
    Status,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        "quit" | "exit" => Command::Quit,
        "status" => Command::Status,
        _ => match line.strip_prefix('!') {
            Some(path) => Command::Navigate {
                path: path.trim().to_string(),
                replace: true,
            },
            None => Command::Navigate {
                path: line.to_string(),
                replace: false,
            },
        },
    }
}

/// Builds the document, coordinator and router described by `config` and
/// registers its sections and extensions. Routes are not started yet.
pub fn build(config: &ResolvedConfig) -> io::Result<(Edison, Arc<MemoryDocument>)> {
    let document = Arc::new(load_document(config));

    let start_path = config.start_path.clone();
    let router_factory = Box::new(move |extensions: &[RouteExtension]| -> Box<dyn Router> {
        let router = PathRouter::new(extensions);
        match &start_path {
            Some(path) => Box::new(router.with_start_path(path.clone())),
            None => Box::new(router),
        }
    });

    let edison = Edison::new(
        CoordinatorOptions {
            route_container: config.route_container.clone(),
            debug: config.debug,
        },
        Collaborators {
            renderer: document.clone(),
            scheduler: Arc::new(TokioScheduler::new()),
            router_factory,
        },
    )
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    for entry in &config.sections {
        register_section(&edison, entry)?;
    }
    for extension in &config.route_extensions {
        if let Err(e) = edison.extend_routes(extension.clone()) {
            warn!("Skipping route extension: {}", e);
        }
    }

    Ok((edison, document))
}

fn load_document(config: &ResolvedConfig) -> MemoryDocument {
    let container = config.route_container.as_deref();
    match (container, config.template_dir.is_dir()) {
        (Some(container), true) => match MemoryDocument::from_dir(&config.template_dir, container) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Failed to read templates from {}: {}",
                    config.template_dir.display(),
                    e
                );
                MemoryDocument::new().with_element(container, "")
            }
        },
        (Some(container), false) => {
            warn!("Template directory {} not found", config.template_dir.display());
            MemoryDocument::new().with_element(container, "")
        }
        (None, _) => MemoryDocument::new(),
    }
}

fn register_section(edison: &Edison, entry: &SectionEntry) -> io::Result<()> {
    let mut options = SectionOptions::new(entry.name.as_str());
    if let Some(parent) = &entry.parent {
        options = options.parent(parent.as_str());
    }
    if let Some(default_route) = &entry.default_route {
        options = options.default_route(default_route.as_str());
    }
    let section = edison
        .create_section(options)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    for route in &entry.routes {
        section.add_route(Arc::new(TemplateRoute::new(
            route.name.as_str(),
            route.template_id(),
        )));
    }
    info!(
        "Registered section '{}' with {} route(s)",
        entry.name,
        entry.routes.len()
    );
    Ok(())
}

/// Waits until an event newer than `before` has been handled and any init it
/// started has finished. Returns `None` when nothing settled in time or the
/// event did not start a new cycle.
async fn settle(
    status: &mut watch::Receiver<NavigationStatus>,
    before: &NavigationStatus,
) -> Option<NavigationStatus> {
    let settled = status.wait_for(|s| {
        s.events_seen > before.events_seen && s.phase == LifecyclePhase::Idle
    });
    match tokio::time::timeout(SETTLE_TIMEOUT, settled).await {
        Ok(Ok(status)) if status.cycle > before.cycle => Some(status.clone()),
        _ => None,
    }
}

fn report(document: &MemoryDocument, container: &str, status: Option<&NavigationStatus>) {
    let Some(status) = status else {
        println!("(no route matched)");
        return;
    };
    if let Some(failure) = &status.last_failure {
        println!(
            "init of {}/{} failed: {}",
            failure.section, failure.route, failure.message
        );
    }
    match (&status.active_section, &status.active_route) {
        (Some(section), Some(route)) => println!("[{section}/{route}]"),
        (Some(section), None) => println!("[{section}]"),
        _ => {}
    }
    println!("{}", document.content(container).unwrap_or_default());
}

/// Runs the shell until stdin closes or `quit` is read.
pub async fn run(config: ResolvedConfig) -> io::Result<()> {
    let (edison, document) = build(&config)?;
    let container = config.route_container.clone().unwrap_or_default();
    let mut status = edison.status();

    let before = status.borrow().clone();
    edison.init_routes();
    if config.start_path.is_some() {
        report(&document, &container, settle(&mut status, &before).await.as_ref());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Status => println!("{:?}", *status.borrow()),
            Command::Navigate { path, replace } => {
                let before = status.borrow().clone();
                if let Err(e) = edison.navigate(&path, replace) {
                    println!("{e}");
                    continue;
                }
                report(&document, &container, settle(&mut status, &before).await.as_ref());
            }
        }
    }

    info!("Shell exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RouteEntry;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn config(template_dir: PathBuf) -> ResolvedConfig {
        ResolvedConfig {
            route_container: Some("app".to_string()),
            debug: true,
            template_dir,
            start_path: None,
            sections: vec![SectionEntry {
                name: "dashboard".to_string(),
                parent: None,
                default_route: None,
                routes: vec![RouteEntry {
                    name: "home".to_string(),
                    template: None,
                }],
            }],
            route_extensions: vec![json!({"routes": {"": "dashboard"}})],
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("status"), Command::Status);
        assert_eq!(
            parse_command("dashboard/home"),
            Command::Navigate {
                path: "dashboard/home".to_string(),
                replace: false
            }
        );
        assert_eq!(
            parse_command("! settings"),
            Command::Navigate {
                path: "settings".to_string(),
                replace: true
            }
        );
    }

    #[tokio::test]
    async fn test_build_without_container_fails() {
        let mut config = config(PathBuf::from("/nonexistent"));
        config.route_container = None;
        let err = build(&config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_build_registers_sections_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rtpl_home.hbs"), "<h1>{{route}}</h1>").unwrap();

        let (edison, document) = build(&config(dir.path().to_path_buf())).unwrap();
        assert_eq!(edison.route_extensions().len(), 1);

        let mut status = edison.status();
        edison.init_routes();
        let before = status.borrow().clone();
        edison.navigate("", false).unwrap();
        let settled = settle(&mut status, &before).await.unwrap();

        assert_eq!(settled.active_route.as_deref(), Some("home"));
        assert_eq!(document.content("app").unwrap(), "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_unregistered_section_does_not_settle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rtpl_home.hbs"), "<h1>{{route}}</h1>").unwrap();
        let (edison, _document) = build(&config(dir.path().to_path_buf())).unwrap();
        let mut status = edison.status();
        edison.init_routes();

        let before = status.borrow().clone();
        edison.navigate("dashboard", false).unwrap();
        assert!(settle(&mut status, &before).await.is_some());

        // Counted as an event, but no new cycle starts
        let before = status.borrow().clone();
        edison.navigate("nowhere", false).unwrap();
        assert!(settle(&mut status, &before).await.is_none());
        assert_eq!(status.borrow().events_seen, before.events_seen + 1);
        assert_eq!(status.borrow().active_section.as_deref(), Some("dashboard"));
    }
}
