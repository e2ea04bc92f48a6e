//! Result rendering.

pub mod console;
pub mod generator;

pub use console::Console;
pub use generator::*;
