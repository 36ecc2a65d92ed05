//! Serial console: line editing, command table, dispatch.

pub mod commands;
pub mod line_buffer;
pub mod processor;

pub use commands::{COMMANDS, Command, CommandDescriptor, ParsedLine, parse_line};
pub use line_buffer::{LINE_SIZE, LineBuffer};
pub use processor::{Console, PROMPT};
