//! Reply texts
//!
//! Every user-facing string lives here so the dispatcher stays about
//! routing. Replies are Markdown.

use super::classifier::Topic;
use super::commands::Command;
use super::traits::Sender;
use crate::gatekeeper::BugAnalysis;
use crate::ledger::request::{format_timestamp, DecidedRequest, Request, RequestStatus};
use crate::ledger::{LedgerError, LedgerStats};
use std::path::Path;

/// Longest description excerpt put into the admin notice.
const ADMIN_EXCERPT_LEN: usize = 200;

fn handle(sender: &Sender) -> String {
    match &sender.username {
        Some(name) => format!("@{}", name),
        None => "no username".to_string(),
    }
}

fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn welcome(sender: &Sender) -> String {
    format!(
        "Welcome {}! 👋\n\n\
         This bot runs the community testing program.\n\n\
         • Send your wallet address here (DM) to request test tokens\n\
         • Describe any bug you find and it goes to the team\n\n\
         Use /help to see all commands.",
        sender.display_name
    )
}

pub fn start(sender: &Sender) -> String {
    format!(
        "Hi {}! 🚀\n\n\
         **Getting started:**\n\
         1. Use /tokens to see how to request test tokens\n\
         2. Test the platform\n\
         3. Report bugs by describing them in a message or with /report\n\n\
         Use /help for the full command list.",
        sender.display_name
    )
}

pub fn help(include_admin: bool) -> String {
    let mut text = String::from("**Available commands:**\n\n");
    for (syntax, description) in Command::all_commands(include_admin) {
        text.push_str(&format!("{} - {}\n", syntax, description));
    }
    text.push_str("\nYou can also just describe a bug or ask a question.");
    text
}

pub fn tokens_info() -> String {
    "🪙 **Requesting test tokens**\n\n\
     Send your wallet address to me in a **direct message**.\n\
     It must start with `0x` and be 42 characters long.\n\n\
     Example: `0x1234567890123456789012345678901234567890`\n\n\
     Each user and each wallet can be used for one request. \
     The admin reviews requests and you get a message once yours is decided."
        .to_string()
}

pub fn report_info() -> String {
    "🐛 **Reporting a bug**\n\n\
     Just describe the problem in a message: what you did, what you expected \
     and what happened. Mention your device and browser if relevant.\n\n\
     Long reports are best sent by direct message."
        .to_string()
}

pub fn privacy_info() -> String {
    "🔒 **Privacy**\n\n\
     • Wallet addresses are never processed in group chats\n\
     • Detailed reports posted in groups get a privacy notice instead\n\
     • Send sensitive details by direct message"
        .to_string()
}

pub fn topic_reply(topic: Topic, sender: &Sender) -> String {
    match topic {
        Topic::Greeting => format!(
            "Hi {}! 👋\n\nHow can I help? Ask about staking or testing, or use /help for commands.",
            sender.display_name
        ),
        Topic::Product => "🚀 This community tests the platform before release: \
             staking, rewards, vesting and airdrops. Use /start to join in."
            .to_string(),
        Topic::Staking => "💰 **Staking**\n\n\
             Staking is available on the test deployment with multiple reward types \
             and lock periods. Request test tokens with /tokens to try it."
            .to_string(),
        Topic::Purchase => "🛒 **Buying**\n\n\
             The test deployment uses test tokens only. Request yours with /tokens."
            .to_string(),
        Topic::Support => "🆘 **Support**\n\n\
             • /help lists the commands\n\
             • Describe your problem in a message and it is forwarded to the team"
            .to_string(),
        Topic::Testing => "🧪 **Testing program**\n\n\
             • Get test tokens with /tokens\n\
             • Try staking, rewards and airdrops\n\
             • Report bugs by describing them here"
            .to_string(),
    }
}

pub fn fallback(sender: &Sender) -> String {
    format!(
        "Hi {}! 👋\n\nI can help with:\n\
         • Test token requests\n\
         • Bug reports\n\
         • Questions about the testing program\n\n\
         Use /help to see all commands.",
        sender.display_name
    )
}

pub fn submitted(request: &Request) -> String {
    format!(
        "✅ **Token request submitted**\n\n\
         **Wallet:** `{}`\n\
         **Request ID:** `{}`\n\n\
         Your request is waiting for admin approval. \
         You will get a message when it is decided.",
        request.wallet_address, request.request_id
    )
}

pub fn admin_new_request(request: &Request) -> String {
    format!(
        "🆕 **New token request**\n\n\
         **User:** {} ({})\n\
         **Wallet:** `{}`\n\
         **Request ID:** `{}`\n\
         **Time:** {}\n\n\
         /approve_{} to approve\n\
         /reject_{} to reject\n\
         /pending to see all pending requests",
        request.display_name,
        request.handle(),
        request.wallet_address,
        request.request_id,
        request.submitted_at_display(),
        request.request_id,
        request.request_id,
    )
}

/// User-facing text for each ledger error.
pub fn ledger_error(err: &LedgerError) -> String {
    match err {
        LedgerError::InvalidAddress(_) => "❌ **Invalid wallet address**\n\n\
             A wallet address starts with `0x` followed by 40 hex characters \
             (0-9, a-f).\n\n\
             Example: `0x1234567890123456789012345678901234567890`"
            .to_string(),
        LedgerError::DuplicateUser { existing } => format!(
            "❌ **Duplicate request**\n\n\
             You have already requested tokens. Status: **{}**\n\n\
             • Wallet: `{}`\n\
             • Submitted: {}\n\n\
             To change your wallet address, contact the admin.",
            existing.status,
            existing.wallet_address,
            existing.submitted_at_display()
        ),
        LedgerError::WalletReused(_) => "❌ **Wallet already used**\n\n\
             This wallet address is already attached to a token request. \
             Use a different wallet or contact the admin."
            .to_string(),
        LedgerError::NotFound(id) => format!("❌ Request `{}` not found.", id),
        LedgerError::InvalidTransition { request_id, from, .. } => format!(
            "⚠️ Request `{}` is already **{}**; it cannot be changed.",
            request_id, from
        ),
        LedgerError::PersistenceFailure(_) => {
            "⚠️ Saving the ledger failed. The change is kept in memory; \
             check the service logs."
                .to_string()
        }
        LedgerError::AdminNotifyFailure(_) => "⚠️ Could not reach the admin.".to_string(),
    }
}

pub fn wallet_deferred(masked: &str) -> String {
    format!(
        "⚠️ **Privacy notice**\n\n\
         You shared a wallet address in a group chat. It was **not** recorded.\n\n\
         **Address:** `{}`\n\n\
         Send it to me in a direct message to request tokens.",
        masked
    )
}

pub fn report_deferred(summary: &str) -> String {
    format!(
        "⚠️ **Privacy notice**\n\n\
         You shared a detailed report in a group chat. \
         Please send the full report by direct message.\n\n\
         **Brief summary:** {}",
        summary
    )
}

pub fn bug_ack(sender: &Sender, description: &str) -> String {
    format!(
        "🐛 **Bug report received**\n\n\
         **From:** {} ({})\n\
         **Description:** {}\n\n\
         It has been forwarded to the team. You may be contacted for details.\n\n\
         Thank you for helping improve the platform! 🚀",
        sender.display_name,
        handle(sender),
        description
    )
}

pub fn admin_bug_report(sender: &Sender, description: &str, analysis: &BugAnalysis) -> String {
    let mut text = format!(
        "🐛 **Bug report**\n\n\
         **User:** {} ({})\n\n\
         **Description:**\n{}\n\n\
         **Triage:**\n\
         • Severity: {}\n\
         • Priority: {}\n\
         • Category: {}\n\
         • Effort: {}\n\
         • Confidence: {}\n",
        sender.display_name,
        handle(sender),
        excerpt(description, ADMIN_EXCERPT_LEN),
        analysis.severity.as_str().to_uppercase(),
        analysis.priority.as_str().to_uppercase(),
        analysis.category.as_str().replace('-', " ").to_uppercase(),
        analysis.effort.as_str().to_uppercase(),
        analysis.confidence.as_str().to_uppercase(),
    );

    let actions = analysis.category.suggested_actions();
    if !actions.is_empty() {
        text.push_str("\n**Suggested actions:**\n");
        for action in actions {
            text.push_str(&format!("• {}\n", action));
        }
    }
    text
}

pub fn own_status(request: Option<&Request>) -> String {
    match request {
        Some(request) => format!(
            "📋 **Your token request**\n\n\
             • Status: **{}**\n\
             • Wallet: `{}`\n\
             • Request ID: `{}`\n\
             • Submitted: {}",
            request.status,
            request.wallet_address,
            request.request_id,
            request.submitted_at_display()
        ),
        None => "You have no token request yet. Use /tokens to see how to submit one.".to_string(),
    }
}

pub fn pending_list(pending: &[Request]) -> String {
    if pending.is_empty() {
        return "📋 No pending requests.".to_string();
    }

    let mut text = format!("📋 **Pending requests ({}):**\n\n", pending.len());
    for (i, request) in pending.iter().enumerate() {
        text.push_str(&format!(
            "{}. **{}** ({})\n   Wallet: `{}`\n   ID: `{}`\n   Time: {}\n\n",
            i + 1,
            request.display_name,
            request.handle(),
            request.wallet_address,
            request.request_id,
            request.submitted_at_display()
        ));
    }
    text.push_str("/approve_<requestId> to approve\n/reject_<requestId> to reject");
    text
}

pub fn approved_list(approved: &[DecidedRequest]) -> String {
    if approved.is_empty() {
        return "✅ No approved requests.".to_string();
    }

    let mut text = format!("✅ **Approved requests ({}):**\n\n", approved.len());
    for (i, decided) in approved.iter().enumerate() {
        let request = &decided.request;
        text.push_str(&format!(
            "{}. **{}** ({})\n   Wallet: `{}`\n   Approved: {}\n\n",
            i + 1,
            request.display_name,
            request.handle(),
            request.wallet_address,
            format_timestamp(decided.decided_at)
        ));
    }
    text
}

/// Confirmation for the admin after a decision.
pub fn decision_confirmed(request: &Request) -> String {
    format!(
        "Request `{}` from {} ({}) is now **{}**.",
        request.request_id,
        request.display_name,
        request.handle(),
        request.status
    )
}

/// Notice to the requester after a decision.
pub fn decision_notice(request: &Request) -> String {
    match request.status {
        RequestStatus::Approved => format!(
            "🎉 **Token request approved**\n\n\
             Tokens will be sent to `{}` with the next distribution.",
            request.wallet_address
        ),
        RequestStatus::Rejected => "Your token request was not approved. \
             Contact the admin if you think this is a mistake."
            .to_string(),
        RequestStatus::Pending => format!("Your token request `{}` is pending.", request.request_id),
    }
}

pub fn distribution_written(count: usize, path: &Path) -> String {
    if count == 0 {
        return "❌ No approved requests to distribute.".to_string();
    }
    format!(
        "✅ **Distribution list written**\n\n\
         📁 File: `{}`\n\
         👥 Addresses: {}",
        path.display(),
        count
    )
}

pub fn stats(stats: &LedgerStats, degraded: bool) -> String {
    let mut text = format!(
        "📊 **Requests**\n\n\
         • Total: {}\n\
         • Pending: {}\n\
         • Approved: {}\n\
         • Rejected: {}",
        stats.total, stats.pending, stats.approved, stats.rejected
    );
    if degraded {
        text.push_str("\n\n⚠️ Last save failed; the ledger file is behind.");
    }
    text
}

pub fn admin_only() -> String {
    "🔒 Admin access required.".to_string()
}

pub fn dm_only() -> String {
    "🔒 Please use this command in a direct message.".to_string()
}

pub fn usage(syntax: &str) -> String {
    format!("Usage: `{}`", syntax)
}

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command `/{}`. Use /help to see all commands.", name)
}
