//! Message classification
//!
//! Decides what an inbound text is before anything acts on it. Rules run in
//! a fixed order and the first match wins:
//!
//! 1. command (`/name args...`)
//! 2. wallet candidate (`0x...`, exactly 42 chars)
//! 3. bug report candidate (longer than [`BUG_REPORT_MIN_LEN`])
//! 4. conversational topic (keyword sets, case-insensitive)
//! 5. fallback
//!
//! The wallet rule only checks shape; the ledger validates the hex digits.

use crate::ledger::request::WALLET_ADDRESS_LEN;
use std::fmt;

/// Texts longer than this (in chars) are treated as bug reports.
pub const BUG_REPORT_MIN_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Greeting,
    Product,
    Staking,
    Purchase,
    Support,
    Testing,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Greeting => "greeting",
            Topic::Product => "product-question",
            Topic::Staking => "staking-question",
            Topic::Purchase => "purchase-question",
            Topic::Support => "support-question",
            Topic::Testing => "testing-question",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword sets, checked in order.
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Greeting, &["hi", "hello", "hey"]),
    (Topic::Product, &["what is", "tell me about"]),
    (Topic::Staking, &["staking", "stake", "apy"]),
    (Topic::Purchase, &["how to buy", "buy", "presale"]),
    (Topic::Support, &["help", "support", "problem"]),
    (Topic::Testing, &["test", "testing"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command { name: String, args: Vec<String> },
    WalletCandidate(String),
    BugReportCandidate(String),
    ConversationalIntent(Topic),
    Fallback,
}

/// What a rule sees.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    /// Message text with surrounding whitespace removed.
    pub text: &'a str,
    /// Channel is shared. Classification itself is channel-independent;
    /// the privacy gate applies channel policy afterwards.
    pub is_shared: bool,
}

pub type Rule = fn(&ClassifyInput<'_>) -> Option<Intent>;

/// Classification rules in priority order.
pub const RULES: &[(&str, Rule)] = &[
    ("command", command_rule),
    ("wallet", wallet_rule),
    ("bug_report", bug_report_rule),
    ("conversational", conversational_rule),
];

pub fn classify(text: &str, is_shared: bool) -> Intent {
    let input = ClassifyInput {
        text: text.trim(),
        is_shared,
    };
    RULES
        .iter()
        .find_map(|(_, rule)| rule(&input))
        .unwrap_or(Intent::Fallback)
}

fn command_rule(input: &ClassifyInput<'_>) -> Option<Intent> {
    let body = input.text.strip_prefix('/')?;
    let mut parts = body.split_whitespace();
    let head = parts.next().unwrap_or("");
    // `/cmd@botname` is how group chats address one bot
    let name = head.split('@').next().unwrap_or("").to_lowercase();
    Some(Intent::Command {
        name,
        args: parts.map(str::to_string).collect(),
    })
}

fn wallet_rule(input: &ClassifyInput<'_>) -> Option<Intent> {
    (input.text.starts_with("0x") && input.text.chars().count() == WALLET_ADDRESS_LEN)
        .then(|| Intent::WalletCandidate(input.text.to_string()))
}

fn bug_report_rule(input: &ClassifyInput<'_>) -> Option<Intent> {
    (input.text.chars().count() > BUG_REPORT_MIN_LEN)
        .then(|| Intent::BugReportCandidate(input.text.to_string()))
}

fn conversational_rule(input: &ClassifyInput<'_>) -> Option<Intent> {
    let lower = input.text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(topic, _)| Intent::ConversationalIntent(*topic))
}
