// Composition root and command-line edge.
//
// Responsibilities
// - Read config from the environment.
// - Instantiate concrete infrastructure and wire it into the use case handlers.
// - Run background work (retry timer, statistics reconcile) for the lifetime of a context.

pub mod cli;
pub mod config;
pub mod context;
