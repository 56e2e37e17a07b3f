// crates/core/src/lib.rs
pub mod error;
pub mod interpreter;
pub mod line_buffer;
pub mod markers;

pub use error::*;
pub use interpreter::{resolve as resolve_interpreter, resolved_interpreter};
pub use line_buffer::{LineBuffer, DEFAULT_LINE_CAP};
pub use markers::{is_recognized, MarkerFilter};
