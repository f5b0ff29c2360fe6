//! # Core Navigation Lifecycle
//!
//! Sections, routes and the coordinator that moves between them.
//! Nothing here knows how paths are parsed or where markup ends up.
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │            CORE             │
//!                    │       (this module)         │
//!                    │                             │
//!                    │  • Coordinator (state)      │
//!                    │  • Action (router events)   │
//!                    │  • update() (reducer)       │
//!                    │  • Intervals (scoped)       │
//!                    └──────────────┬──────────────┘
//!                                   │
//!            ┌──────────────────────┼──────────────────────┐
//!            ▼                      ▼                      ▼
//!     ┌────────────┐         ┌────────────┐         ┌────────────┐
//!     │   Router   │         │   Render   │         │ Scheduler  │
//!     │  (paths →  │         │ (document, │         │  (tokio    │
//!     │   events)  │         │ templates) │         │ intervals) │
//!     └────────────┘         └────────────┘         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `Coordinator`: registry, active selection, status
//! - [`action`]: `Action`/`Effect` and the `update()` transitions
//! - [`section`]: Named groups of routes with lifecycle hooks
//! - [`route`]: The `Route` trait and the template-backed route
//! - [`context`]: What hooks may touch while a route is being set up
//! - [`interval`]: Section and parent-section scoped recurring tasks
//! - [`config`]: TOML/env/CLI configuration for the binary

pub mod action;
pub mod config;
pub mod context;
pub mod interval;
pub mod route;
pub mod section;
pub mod state;
