//! Orchestrator - run/poll engine and incremental terminal rendering
//!
//! [`Orchestrator::run`] submits a test through a [`TestRunner`], polls it
//! in a background task and renders each snapshot until the test reports
//! itself finished.
//!
//! [`TestRunner`]: perfops_common::TestRunner

mod accumulator;
mod orchestrator;
mod poller;
mod progress;
mod renderer;
mod terminal;

#[cfg(test)]
mod testing;

pub use accumulator::ResultSlot;
pub use orchestrator::{DisplayMode, Orchestrator, RunConfig, DEFAULT_RENDER_INTERVAL};
pub use poller::{Poller, DEFAULT_POLL_INTERVAL};
pub use progress::{Spinner, FRAME_INTERVAL};
pub use renderer::{clip_frame, print_output, print_output_json, Formatter, StreamRenderer};
pub use terminal::Terminal;
