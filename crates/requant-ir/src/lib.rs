#![warn(missing_docs)]

//! Read-only intermediate representation consumed by the `requant` engine.
//!
//! The conversion engine never owns or mutates a model graph; it classifies
//! one. This crate holds the view types it classifies: per-array descriptors
//! (element kind, role, observed range, existing quantization parameters),
//! operator records with fake-quant marker locations, and the operator
//! supportability classification used before a pass plan is handed to the
//! rewrite executor.

#[macro_use]
extern crate derive_new;

mod array;
mod graph;
mod support;

pub use array::*;
pub use graph::*;
pub use support::*;
