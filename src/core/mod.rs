pub mod action;
pub mod command;

pub use action::{Action, Notice, Notifier, NotifyLevel, Request};
pub use command::{command_hint, parse_command, Command};
