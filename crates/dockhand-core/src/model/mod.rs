//! Data model
//!
//! Each type lives in its own module and is re-exported here.

mod reference;
mod registry;
mod request;
mod result;

// Re-exports
pub use reference::*;
pub use registry::*;
pub use request::*;
pub use result::*;
