//! Edison library exports

pub mod core;
pub mod render;
pub mod router;
pub mod runtime;
pub mod shell;

#[cfg(test)]
pub mod test_support;

pub use runtime::{Collaborators, Edison};
