//! Fuzz target: console line buffer and command matching
//!
//! Pushes arbitrary bytes into a `LineBuffer`, matching whatever is held
//! at every CR, and asserts the buffer never reaches capacity.
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use remote_switch::console::{LINE_SIZE, LineBuffer, ParsedLine, parse_line};

fuzz_target!(|data: &[u8]| {
    let mut line = LineBuffer::new();

    for &b in data {
        if b == b'\r' {
            if let ParsedLine::Known { args, .. } = parse_line(line.as_str()) {
                assert!(args.len() < LINE_SIZE);
            }
            line.clear();
            continue;
        }
        if line.push(b).is_err() {
            assert!(line.is_empty(), "overflow must reset the line");
        }
        assert!(line.len() < LINE_SIZE);
    }
});
