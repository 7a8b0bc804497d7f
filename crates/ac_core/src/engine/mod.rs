//! Hybrid prediction engine
//!
//! Frame-driven, single-threaded, allocation-light. The host calls
//! [`manager::PredictionManager::update`] once per tick and
//! [`manager::PredictionManager::predict`] per aiming decision; everything
//! else is internal plumbing.

pub mod config;
pub mod constants;
pub mod coordinates;
pub mod edge_cases;
pub mod fusion;
pub mod grid;
pub mod manager;
pub mod opportunity;
pub mod pattern;
pub mod physics;
pub mod result;
pub mod sample;
pub mod shapes;
pub mod spell;
pub mod tracker;
pub mod world;

#[cfg(test)]
pub mod test_support;
