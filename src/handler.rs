//! Line commands read by the `bfs` binary, and how they drive a session.

use std::fmt::Write as _;

use crate::error::{AppError, Result};
use crate::event::Intent;
use crate::fs::tree::{LoadState, NodeKind};
use crate::session::Session;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    Status(String),
    Tree,
    Covering,
    Saved,
    Map,
    /// Print the payload to send: a restore request when a target is given.
    Payload(Option<String>),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  open PATH | close PATH | toggle PATH | refresh PATH
  select PATH (flip) | check PATH | uncheck PATH
  status PATH | tree | covering | saved | map | payload [RESTORE_PATH]
  help | quit";

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, Some(rest.trim().to_string())),
        None => (line, None),
    };
    let need = |arg: Option<String>| {
        arg.filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::Usage(format!("{} needs a path", verb)))
    };

    let command = match verb {
        "open" => Command::Intent(Intent::SetOpen(need(arg)?, true)),
        "close" => Command::Intent(Intent::SetOpen(need(arg)?, false)),
        "toggle" => Command::Intent(Intent::Toggle(need(arg)?)),
        "refresh" => Command::Intent(Intent::Refresh(need(arg)?)),
        "select" => Command::Intent(Intent::ToggleSelect(need(arg)?)),
        "check" => Command::Intent(Intent::SetSelect(need(arg)?, true)),
        "uncheck" => Command::Intent(Intent::SetSelect(need(arg)?, false)),
        "status" => Command::Status(need(arg)?),
        "tree" => Command::Tree,
        "covering" => Command::Covering,
        "saved" => Command::Saved,
        "map" => Command::Map,
        "payload" => Command::Payload(arg.filter(|a| !a.is_empty())),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(AppError::Usage(format!("unknown command: {}", other)));
        }
    };
    Ok(Some(command))
}

/// Render the open part of the tree as indented text.
pub fn render_tree(session: &Session) -> String {
    let mut out = String::new();
    for item in session.visible_items() {
        let indent = "  ".repeat(item.depth);
        let suffix = match (item.kind, item.load_state) {
            (NodeKind::File, _) => "",
            (NodeKind::Directory, LoadState::Loading) => "/ (loading)",
            (NodeKind::Directory, _) => "/",
        };
        let name = if item.depth == 0 { "" } else { item.name.as_str() };
        let _ = writeln!(out, "{}{} {}{}", indent, item.status.marker(), name, suffix);
    }
    out
}

/// Run a non-intent command and return what to print.
pub fn describe(session: &Session, command: &Command) -> Result<String> {
    let text = match command {
        Command::Status(p) => {
            let status = session.display_status(p)?;
            format!("{} {}", status.marker(), p)
        }
        Command::Tree => render_tree(session),
        Command::Covering => session
            .covering_selection()?
            .into_iter()
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Saved => session.explicit_selections().join("\n"),
        Command::Map => serde_json::to_string_pretty(&session.selection_map())?,
        Command::Payload(Some(target)) => {
            serde_json::to_string_pretty(&session.restore_request(target)?)?
        }
        Command::Payload(None) => serde_json::to_string_pretty(&session.backup_selection()?)?,
        Command::Help => HELP.to_string(),
        Command::Intent(_) | Command::Quit => String::new(),
    };
    Ok(text)
}
