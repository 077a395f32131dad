pub mod active_scroll;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod hints;
pub mod host;
pub mod observer;
pub mod refresh_rate;
pub mod sim;
pub mod source;
pub mod target;
pub mod trace;
// cmd and reports belong to the binary (see main.rs).

pub use engine::ScrollTimingEngine;
pub use entry::ScrollTimingEntry;
pub use error::{ScrollTimingError, StResult};
pub use source::ScrollSource;
