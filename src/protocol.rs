//! Worker Command Protocol
//!
//! The worker reads one command per line on stdin:
//!
//! ```text
//! load <plugin_path>                 - load a plugin
//! view <plugin_name>                 - display the plugin's parameters
//! set  <plugin_name> <key> <value>   - set a parameter for the plugin
//! run  <plugin_name>                 - execute the plugin
//! help <plugin_name>                 - show the plugin's help
//! list                               - list plugins and their parameters
//! ?                                  - show the option summary
//! exit                               - leave the command loop
//! ```
//!
//! Arguments are separated by single spaces, so no argument may contain
//! whitespace. Order is significant: a `set` mutates worker-side state that
//! the next `run` of the same plugin consumes.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One line of the worker protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Load(String),
    View(String),
    Set {
        plugin: String,
        key: String,
        value: String,
    },
    Run(String),
    Help(String),
    List,
    Options,
    Exit,
}

impl CommandLine {
    pub fn load(path: &Path) -> Self {
        CommandLine::Load(path.display().to_string())
    }

    pub fn set(plugin: &str, key: &str, value: impl fmt::Display) -> Self {
        CommandLine::Set {
            plugin: plugin.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn set_path(plugin: &str, key: &str, path: &Path) -> Self {
        Self::set(plugin, key, path.display())
    }

    pub fn run(plugin: &str) -> Self {
        CommandLine::Run(plugin.to_string())
    }

    /// Plugin this line addresses, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            CommandLine::View(p) | CommandLine::Run(p) | CommandLine::Help(p) => Some(p),
            CommandLine::Set { plugin, .. } => Some(plugin),
            CommandLine::Load(_) | CommandLine::List | CommandLine::Options | CommandLine::Exit => {
                None
            }
        }
    }

    /// Newline-terminated wire form.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Load(path) => write!(f, "load {}", path),
            CommandLine::View(plugin) => write!(f, "view {}", plugin),
            CommandLine::Set { plugin, key, value } => {
                write!(f, "set {} {} {}", plugin, key, value)
            }
            CommandLine::Run(plugin) => write!(f, "run {}", plugin),
            CommandLine::Help(plugin) => write!(f, "help {}", plugin),
            CommandLine::List => write!(f, "list"),
            CommandLine::Options => write!(f, "?"),
            CommandLine::Exit => write!(f, "exit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    Empty,
    UnknownCommand(String),
    Arity {
        command: String,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCommandError::Empty => write!(f, "empty command line"),
            ParseCommandError::UnknownCommand(c) => write!(f, "unknown command: {}", c),
            ParseCommandError::Arity {
                command,
                expected,
                found,
            } => write!(
                f,
                "`{}` takes {} argument(s), found {}",
                command, expected, found
            ),
        }
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for CommandLine {
    type Err = ParseCommandError;

    /// Same acceptance rules as the worker's own command loop: the line is
    /// trimmed, split on whitespace, and the argument count must match.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (&command, args) = parts.split_first().ok_or(ParseCommandError::Empty)?;

        let expected = match command {
            "load" | "view" | "run" | "help" => 1,
            "set" => 3,
            "list" | "?" | "exit" => 0,
            other => return Err(ParseCommandError::UnknownCommand(other.to_string())),
        };
        if args.len() != expected {
            return Err(ParseCommandError::Arity {
                command: command.to_string(),
                expected,
                found: args.len(),
            });
        }

        Ok(match command {
            "load" => CommandLine::Load(args[0].to_string()),
            "view" => CommandLine::View(args[0].to_string()),
            "run" => CommandLine::Run(args[0].to_string()),
            "help" => CommandLine::Help(args[0].to_string()),
            "set" => CommandLine::Set {
                plugin: args[0].to_string(),
                key: args[1].to_string(),
                value: args[2].to_string(),
            },
            "list" => CommandLine::List,
            "?" => CommandLine::Options,
            _ => CommandLine::Exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_syntax() {
        assert_eq!(
            CommandLine::load(Path::new("../src/plugins/hello.so")).to_string(),
            "load ../src/plugins/hello.so"
        );
        assert_eq!(
            CommandLine::set("prime", "limit", 101).to_string(),
            "set prime limit 101"
        );
        assert_eq!(CommandLine::run("graph").to_wire(), "run graph\n");
        assert_eq!(CommandLine::Options.to_string(), "?");
        assert_eq!(CommandLine::Exit.to_wire(), "exit\n");
    }

    #[test]
    fn test_parse_accepts_worker_commands() {
        let cmd: CommandLine = "  set matrix displayResult 0 ".parse().unwrap();
        assert_eq!(cmd, CommandLine::set("matrix", "displayResult", 0));
        assert_eq!(cmd.plugin(), Some("matrix"));

        assert_eq!("list".parse::<CommandLine>().unwrap(), CommandLine::List);
        assert_eq!("?".parse::<CommandLine>().unwrap(), CommandLine::Options);
        assert_eq!(
            "view hello".parse::<CommandLine>().unwrap(),
            CommandLine::View("hello".into())
        );
        assert_eq!("exit".parse::<CommandLine>().unwrap().plugin(), None);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        let err = "set matrix displayResult".parse::<CommandLine>().unwrap_err();
        assert_eq!(
            err,
            ParseCommandError::Arity {
                command: "set".into(),
                expected: 3,
                found: 2
            }
        );
        assert!(matches!(
            "list all".parse::<CommandLine>(),
            Err(ParseCommandError::Arity { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert_eq!(
            "unload hello".parse::<CommandLine>(),
            Err(ParseCommandError::UnknownCommand("unload".into()))
        );
        assert_eq!("   ".parse::<CommandLine>(), Err(ParseCommandError::Empty));
    }
}
