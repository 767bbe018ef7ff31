//! Shared test fixtures for ChronoForge crates.
//!
//! - [`engine`] - [`FakeEngine`], a scripted engine over an in-memory stream
//! - [`models`] - sample models with matching solutions
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! chronoforge-test = { workspace = true }
//! ```
//!
//! Then script an engine and hand it to a session:
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronoforge_solver::Solver;
//! use chronoforge_test::{models, FakeEngine};
//!
//! let engine = FakeEngine::solving(|m| models::two_tasks_solution(m, 0).into_iter().collect());
//! let mut solver = Solver::with_launcher(Arc::new(engine.clone()));
//! ```

pub mod engine;
pub mod models;

pub use engine::{FakeEngine, Reply};
pub use models::{alternative, no_overlap, two_tasks, Alternative, NoOverlap, TwoTasks};
