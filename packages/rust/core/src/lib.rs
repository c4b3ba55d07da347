//! Pipeline stages for every promptkit command.
//!
//! Each module is one linear pipeline (collect input, call the external
//! APIs, reformat and persist) built from small `async fn` stages that take
//! their clients by reference. [`fanout`] holds the bounded concurrent
//! runner used by research, and [`input`] the pure validators the CLI
//! re-prompts with.

pub mod advisor;
pub mod ads;
pub mod datagen;
pub mod fanout;
pub mod input;
pub mod leads;
pub mod outreach;
pub mod pipeline;
pub mod prompts;
pub mod research;
pub mod tasks;
pub mod tracker;
pub mod videos;

#[cfg(test)]
mod test_support;

pub use fanout::{Outcome, fan_out};
pub use pipeline::{ProgressReporter, SilentProgress};
