//! physgraph - Graph model and layout engine for a physics wiki.
//!
//! This crate turns a static field/topic taxonomy merged with a persisted graph store
//! into a typed node/edge model, and lays that model out either on chronological
//! lanes or as a sector-constrained force-directed network.

pub mod classify;
pub mod concepts;
pub mod error;
pub mod graph_types;
pub mod layout;
pub mod model;
pub mod server;
pub mod session;
pub mod simulation;
pub mod store;
pub mod taxonomy;
