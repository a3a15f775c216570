//! Dockhand build-and-publish pipeline
//!
//! Fetches a public repository, builds its container image with the local
//! engine, and publishes it to GHCR or Docker Hub. Output of every external
//! process is streamed line by line into a single run log.

pub mod builder;
pub mod error;
pub mod fetcher;
pub mod log;
pub mod pipeline;
pub mod process;
pub mod pusher;
pub mod resolver;

pub use builder::{BuildOutcome, ImageBuilder};
pub use error::{BuildError, BuildResult};
pub use fetcher::{SourceFetcher, WorkingCopy};
pub use log::{LogSink, RunLog};
pub use pipeline::Pipeline;
pub use pusher::ImagePusher;
pub use resolver::resolve;
