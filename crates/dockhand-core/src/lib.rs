//! Dockhand core
//!
//! Data model shared by every Dockhand crate: the build request a caller
//! submits, the registry it targets, the image reference derived from both,
//! and the result a pipeline run hands back.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod model;
pub mod naming;

pub use error::{CoreError, Result};
pub use model::*;
pub use naming::derive_image_name;
