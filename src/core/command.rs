//! Command parser for the : command system

use crate::domain::ActionKind;

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Session
    Connect,
    Disconnect,
    Refresh,

    // Contract actions
    Submit(ActionKind),

    // App
    Help,
    Quit,

    // Unknown command
    Unknown(String),
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let cmd = input.split_whitespace().next().unwrap_or("");

    match cmd.to_lowercase().as_str() {
        // Session
        "connect" | "conn" => Command::Connect,
        "disconnect" | "dc" => Command::Disconnect,
        "refresh" | "r" => Command::Refresh,

        // Contract actions
        "start" | "start-presale" => Command::Submit(ActionKind::StartPresale),
        "presale-mint" | "pmint" => Command::Submit(ActionKind::PresaleMint),
        "mint" | "public-mint" => Command::Submit(ActionKind::PublicMint),

        // App
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,

        _ => Command::Unknown(input.to_string()),
    }
}

/// Short usage hint shown next to the command line
pub fn command_hint(input: &str) -> Option<&'static str> {
    let cmd = input.split_whitespace().next()?.to_lowercase();
    let hint = match cmd.as_str() {
        "connect" | "conn" => "request wallet access and start polling",
        "disconnect" | "dc" => "drop the session and stop polling",
        "refresh" | "r" => "re-read contract state now",
        "start" | "start-presale" => "owner only: open the presale",
        "presale-mint" | "pmint" => "mint during the presale (whitelisted)",
        "mint" | "public-mint" => "mint after the presale ended",
        _ => return None,
    };
    Some(hint)
}
