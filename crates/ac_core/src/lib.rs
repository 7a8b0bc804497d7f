//! # ac_core - Hybrid Hit-Chance Prediction Engine
//!
//! Estimates, every simulation frame, where a moving target will be when a
//! delayed or traveling effect arrives, and how confident that estimate is.
//! A kinematic reachability bound is fused with a learned model of the
//! target's historical movement, then an aim-point search maximizes the
//! predicted hit probability for the requested effect geometry
//! (point, circle, capsule, cone, or two-point segment).
//!
//! ## Design
//! - Single-threaded and frame-driven: one `update` per tick, predictions on
//!   demand, every call bounded well under a millisecond
//! - Hard-capped ring buffers everywhere; memory is O(tracked targets)
//! - No panics and no fallible engine paths: bad input degrades to an
//!   invalid or low-confidence result, never a crash
//!
//! The host game interface, edge-case classification, telemetry, and
//! visualization are collaborator contracts (see [`engine::world`] and
//! [`engine::edge_cases`]), not part of this crate.

// Game engine APIs often require many parameters for physics, state, etc.
#![allow(clippy::too_many_arguments)]

pub mod engine;

pub use engine::config::{ConeAngleMode, PredictionConfig};
pub use engine::edge_cases::{EdgeCaseAnalyzer, EdgeCaseReport};
pub use engine::manager::PredictionManager;
pub use engine::result::HybridPrediction;
pub use engine::spell::{SpellDescriptor, SpellShape};
pub use engine::world::{GameWorld, MinionSnapshot, UnitId, UnitSnapshot};
