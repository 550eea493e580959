//! Slash commands
//!
//! User commands: /start, /help, /tokens, /report, /status, /privacy
//! Admin commands: /pending, /approved, /approve, /reject,
//! /generate_distribution, /stats
//!
//! `/approve_<id>` and `/reject_<id>` are accepted as one-tap forms of
//! `/approve <id>` and `/reject <id>`.

use crate::ledger::request::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Introduction and first steps
    Start,

    /// Command listing
    Help,

    /// How to request test tokens
    Tokens,

    /// How to report a bug
    Report,

    /// Sender's own request status
    Status,

    /// What is and is not processed in group chats
    Privacy,

    /// Admin: pending requests
    Pending,

    /// Admin: approved requests
    Approved,

    /// Admin: approve a pending request
    Approve { request_id: RequestId },

    /// Admin: reject a pending request
    Reject { request_id: RequestId },

    /// Admin: write the distribution artifact
    GenerateDistribution,

    /// Admin: request counts
    Stats,

    /// Known command with missing arguments
    Usage(&'static str),

    /// Unknown command
    Unknown(String),
}

impl Command {
    /// (syntax, description) for the help listing. `None` for
    /// `Usage`/`Unknown`.
    pub fn help_text(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Command::Start => Some(("/start", "Introduction and first steps")),
            Command::Help => Some(("/help", "Show this command list")),
            Command::Tokens => Some(("/tokens", "How to request test tokens")),
            Command::Report => Some(("/report", "How to report a bug")),
            Command::Status => Some(("/status", "Check your token request (DM only)")),
            Command::Privacy => Some(("/privacy", "How your data is handled in groups")),
            Command::Pending => Some(("/pending", "List pending requests")),
            Command::Approved => Some(("/approved", "List approved requests")),
            Command::Approve { .. } => Some(("/approve <requestId>", "Approve a pending request")),
            Command::Reject { .. } => Some(("/reject <requestId>", "Reject a pending request")),
            Command::GenerateDistribution => Some((
                "/generate_distribution",
                "Write the approved wallet list for distribution",
            )),
            Command::Stats => Some(("/stats", "Request counts by status")),
            Command::Usage(_) | Command::Unknown(_) => None,
        }
    }

    /// Commands shown by /help; admin commands only when `include_admin`.
    pub fn all_commands(include_admin: bool) -> Vec<(&'static str, &'static str)> {
        let placeholder = RequestId::from("");
        let user = [
            Command::Start,
            Command::Help,
            Command::Tokens,
            Command::Report,
            Command::Status,
            Command::Privacy,
        ];
        let admin = [
            Command::Pending,
            Command::Approved,
            Command::Approve {
                request_id: placeholder.clone(),
            },
            Command::Reject {
                request_id: placeholder,
            },
            Command::GenerateDistribution,
            Command::Stats,
        ];

        user.iter()
            .chain(admin.iter().filter(|_| include_admin))
            .filter_map(Command::help_text)
            .collect()
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::Pending
                | Command::Approved
                | Command::Approve { .. }
                | Command::Reject { .. }
                | Command::GenerateDistribution
                | Command::Stats
        )
    }

    /// Replies would expose a wallet or request id.
    pub fn requires_dm(&self) -> bool {
        self.requires_admin() || matches!(self, Command::Status)
    }
}

/// Build a command from a classified name (lower-case, no slash, no
/// `@bot` suffix) and its arguments.
pub fn parse_command(name: &str, args: &[String]) -> Command {
    if let Some(id) = name.strip_prefix("approve_").filter(|id| !id.is_empty()) {
        return Command::Approve {
            request_id: RequestId::from(id),
        };
    }
    if let Some(id) = name.strip_prefix("reject_").filter(|id| !id.is_empty()) {
        return Command::Reject {
            request_id: RequestId::from(id),
        };
    }

    match name {
        "start" => Command::Start,
        "help" => Command::Help,
        "tokens" => Command::Tokens,
        "report" => Command::Report,
        "status" => Command::Status,
        "privacy" => Command::Privacy,
        "pending" => Command::Pending,
        "approved" => Command::Approved,
        "approve" => match args.first() {
            Some(id) => Command::Approve {
                request_id: RequestId::from(id.as_str()),
            },
            None => Command::Usage("/approve <requestId>"),
        },
        "reject" => match args.first() {
            Some(id) => Command::Reject {
                request_id: RequestId::from(id.as_str()),
            },
            None => Command::Usage("/reject <requestId>"),
        },
        "generate_distribution" => Command::GenerateDistribution,
        "stats" => Command::Stats,
        other => Command::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_user_commands() {
        assert_eq!(parse_command("start", &[]), Command::Start);
        assert_eq!(parse_command("help", &[]), Command::Help);
        assert_eq!(parse_command("status", &args(&["ignored"])), Command::Status);
    }

    #[test]
    fn test_parse_approve_forms() {
        let expected = Command::Approve {
            request_id: RequestId::from("req_abc"),
        };
        assert_eq!(parse_command("approve_req_abc", &[]), expected);
        assert_eq!(parse_command("approve", &args(&["req_abc"])), expected);
        assert_eq!(
            parse_command("approve", &[]),
            Command::Usage("/approve <requestId>")
        );
        // bare underscore is not an id
        assert_eq!(
            parse_command("approve_", &[]),
            Command::Unknown("approve_".to_string())
        );
    }

    #[test]
    fn test_parse_reject_forms() {
        let expected = Command::Reject {
            request_id: RequestId::from("req_abc"),
        };
        assert_eq!(parse_command("reject_req_abc", &[]), expected);
        assert_eq!(parse_command("reject", &args(&["req_abc", "extra"])), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse_command("faq", &[]),
            Command::Unknown("faq".to_string())
        );
    }

    #[test]
    fn test_admin_and_dm_requirements() {
        assert!(Command::Pending.requires_admin());
        assert!(Command::Pending.requires_dm());
        assert!(!Command::Status.requires_admin());
        assert!(Command::Status.requires_dm());
        assert!(!Command::Help.requires_dm());
    }

    #[test]
    fn test_help_listing() {
        let user_only = Command::all_commands(false);
        let with_admin = Command::all_commands(true);

        assert_eq!(user_only.len(), 6);
        assert_eq!(with_admin.len(), 12);
        assert!(user_only.iter().all(|(syntax, _)| !syntax.starts_with("/pending")));
        assert!(with_admin.iter().any(|(syntax, _)| *syntax == "/generate_distribution"));
    }
}
