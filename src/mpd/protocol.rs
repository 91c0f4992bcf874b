//! MPD wire protocol constants and command lines.
//!
//! Reference: https://mpd.readthedocs.io/en/latest/protocol.html

use std::fmt;

/// Prefix of the line the server sends on accept.
pub const GREETING: &str = "OK MPD";
/// Line that ends a successful reply.
pub const SUCCESS: &str = "OK";
/// Prefix of the line that ends a failed reply.
pub const ACK: &str = "ACK";
/// Separator between key and value in reply lines.
pub const SEPARATOR: &str = ": ";

/// Outcome of classifying one reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyLine<'a> {
    /// Payload line belonging to the reply.
    Data(&'a str),
    /// Reply ended with `OK`.
    Ok,
    /// Reply ended with `ACK`; carries the text after the marker.
    Ack(&'a str),
}

impl<'a> ReplyLine<'a> {
    /// Classify a line that has already been stripped of surrounding whitespace.
    pub fn classify(line: &'a str) -> Self {
        if line == SUCCESS {
            ReplyLine::Ok
        } else if let Some(rest) = line.strip_prefix(ACK) {
            ReplyLine::Ack(rest.trim_start())
        } else {
            ReplyLine::Data(line)
        }
    }
}

/// Split a greeting line into its version suffix, if it is a valid greeting.
pub fn parse_greeting(line: &str) -> Option<&str> {
    line.strip_prefix(GREETING).map(str::trim)
}

/// One command line: a name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    /// Emitted as-is unless it contains whitespace.
    Plain(String),
    /// Always wrapped in double quotes.
    Quoted(String),
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Append an argument, quoting it only if it contains whitespace.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(Arg::Plain(value.to_string()));
        self
    }

    /// Append an argument that is always quoted.
    ///
    /// Embedded `"` characters are passed through untouched.
    pub fn quoted(mut self, value: impl ToString) -> Self {
        self.args.push(Arg::Quoted(value.to_string()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn status() -> Self {
        Self::new("status")
    }

    pub fn current_song() -> Self {
        Self::new("currentsong")
    }

    /// `play [<pos>]`
    pub fn play(position: Option<u32>) -> Self {
        let cmd = Self::new("play");
        match position {
            Some(pos) => cmd.arg(pos),
            None => cmd,
        }
    }

    /// `playid [<id>]`
    pub fn play_id(id: Option<u32>) -> Self {
        let cmd = Self::new("playid");
        match id {
            Some(id) => cmd.arg(id),
            None => cmd,
        }
    }

    pub fn pause(paused: bool) -> Self {
        Self::new("pause").arg(flag(paused))
    }

    pub fn random(enabled: bool) -> Self {
        Self::new("random").arg(flag(enabled))
    }

    pub fn repeat(enabled: bool) -> Self {
        Self::new("repeat").arg(flag(enabled))
    }

    pub fn single(enabled: bool) -> Self {
        Self::new("single").arg(flag(enabled))
    }

    pub fn next() -> Self {
        Self::new("next")
    }

    pub fn previous() -> Self {
        Self::new("previous")
    }

    /// `list <tag> [<filter tag> "<value>" ...]`
    pub fn list(tag: &str, filters: &[(&str, &str)]) -> Self {
        filters
            .iter()
            .fold(Self::new("list").arg(tag), |cmd, (filter_tag, value)| {
                cmd.arg(filter_tag).quoted(value)
            })
    }
}

fn flag(on: bool) -> u8 {
    u8::from(on)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for arg in &self.args {
            match arg {
                Arg::Plain(value) if !value.chars().any(char::is_whitespace) => {
                    write!(f, " {}", value)?
                }
                Arg::Plain(value) | Arg::Quoted(value) => write!(f, " \"{}\"", value)?,
            }
        }
        Ok(())
    }
}
