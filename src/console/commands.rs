//! Console command table
//!
//! A line matches a command when its first whitespace-delimited token equals
//! the command name exactly; `heap now` is `heap`, `heapX` is unknown.

/// Every console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Wifi,
    Heap,
    Privkey,
    Repertory,
    Show,
    Reset,
    Start,
    Stop,
    Help,
}

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub usage: &'static str,
    pub brief: &'static str,
    pub command: Command,
}

/// All available commands, in help order
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "wifi", usage: "wifi", brief: "Modify wifi information and reconnect", command: Command::Wifi },
    CommandDescriptor { name: "heap", usage: "heap", brief: "Show free heap space size", command: Command::Heap },
    CommandDescriptor { name: "privkey", usage: "privkey", brief: "Update private key;  ESC:exit  Ctrl+S:save", command: Command::Privkey },
    CommandDescriptor { name: "repertory", usage: "repertory <URL>", brief: "Update repository URL", command: Command::Repertory },
    CommandDescriptor { name: "show", usage: "show", brief: "Show configuration information", command: Command::Show },
    CommandDescriptor { name: "reset", usage: "reset", brief: "Restart the system", command: Command::Reset },
    CommandDescriptor { name: "start", usage: "start", brief: "Start server", command: Command::Start },
    CommandDescriptor { name: "stop", usage: "stop", brief: "Stop server", command: Command::Stop },
    CommandDescriptor { name: "help", usage: "help", brief: "Show help message", command: Command::Help },
];

/// Result of matching one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine<'a> {
    /// Blank line.
    Empty,
    Known { command: Command, args: &'a str },
    Unknown(&'a str),
}

/// Match `line` against [`COMMANDS`].
pub fn parse_line(line: &str) -> ParsedLine<'_> {
    let trimmed = line.trim_start();
    let Some(name) = trimmed.split_whitespace().next() else {
        return ParsedLine::Empty;
    };
    let args = trimmed[name.len()..].trim();
    COMMANDS
        .iter()
        .find(|c| c.name == name)
        .map_or(ParsedLine::Unknown(line), |c| ParsedLine::Known {
            command: c.command,
            args,
        })
}

/// First whitespace-delimited argument, if any.
pub fn first_arg(args: &str) -> Option<&str> {
    args.split_whitespace().next()
}
