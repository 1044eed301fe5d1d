//! `mdptools`: build, compose, reduce, and analyze probabilistic concurrent
//! systems modeled as Markov decision processes.
//!
//! A system is assembled from [`process::Process`]es, each a small
//! guarded-transition automaton written in the [`command`] language; calling
//! [`system::System::compose`] synchronizes matching action labels across
//! processes into one flat [`system::System`]. From there, [`search`]
//! explores the reachable state space (optionally guided by a
//! partial-order-reduction selector from [`selectors`]), [`solver`] computes
//! maximum reachability probabilities over the explored graph, [`validate`]
//! checks it for well-formedness, and [`emit`] renders it to PRISM model
//! checker input.

pub mod command;
pub mod demos;
pub mod diag;
pub mod dsl;
pub mod emit;
pub mod error;
pub mod experiment;
pub mod intern;
pub mod process;
pub mod search;
pub mod selectors;
pub mod solver;
pub mod state;
pub mod system;
pub mod transition;
pub mod validate;

#[cfg(feature = "dot")]
pub mod render;

pub use error::{CompositionError, ParseError};
pub use intern::{Id, Interner};
pub use process::{Process, ProcessId};
pub use search::{explore_bfs, explore_dfs, Order, Visit};
pub use state::{PartialState, State};
pub use system::System;
pub use transition::{Action, Outcome, Post, Transition};
