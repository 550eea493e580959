//! Bug report triage
//!
//! Keyword heuristics that give the admin a first read on a forwarded
//! report. Matching is case-insensitive substring search; the first rule
//! that matches in each table wins.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    WalletIntegration,
    MobileUx,
    Authentication,
    Trading,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WalletIntegration => "wallet-integration",
            Category::MobileUx => "mobile-ux",
            Category::Authentication => "authentication",
            Category::Trading => "trading",
            Category::General => "general",
        }
    }

    /// First things to check for this kind of report.
    pub fn suggested_actions(&self) -> &'static [&'static str] {
        match self {
            Category::WalletIntegration => &[
                "Check wallet connection logic",
                "Verify transaction handling",
            ],
            Category::MobileUx => &["Test on mobile devices", "Check responsive design"],
            Category::Authentication => &[
                "Review authentication flow",
                "Check session management",
            ],
            Category::Trading => &[
                "Verify token contract interactions",
                "Check swap functionality",
            ],
            Category::General => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BugAnalysis {
    pub severity: Level,
    pub priority: Priority,
    pub category: Category,
    pub effort: Level,
    pub confidence: Level,
}

const SEVERITY_RULES: &[(&[&str], Level, Priority)] = &[
    (
        &["crash", "error", "broken", "not working"],
        Level::High,
        Priority::Urgent,
    ),
    (&["slow", "performance", "lag"], Level::Medium, Priority::High),
    (&["ui", "design", "looks"], Level::Low, Priority::Normal),
];

const CATEGORY_RULES: &[(&[&str], Category)] = &[
    (&["wallet", "connect", "transaction"], Category::WalletIntegration),
    (&["mobile", "phone", "responsive"], Category::MobileUx),
    (&["login", "auth", "sign"], Category::Authentication),
    (&["token", "swap", "trade"], Category::Trading),
];

/// Words that suggest reproduction detail.
const DETAIL_MARKERS: &[&str] = &["steps", "when", "browser"];

pub fn analyze_report(description: &str) -> BugAnalysis {
    let text = description.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| text.contains(w));

    let (severity, priority) = SEVERITY_RULES
        .iter()
        .find(|(words, _, _)| contains_any(words))
        .map(|(_, severity, priority)| (*severity, *priority))
        .unwrap_or((Level::Medium, Priority::Normal));

    let category = CATEGORY_RULES
        .iter()
        .find(|(words, _)| contains_any(words))
        .map(|(_, category)| *category)
        .unwrap_or(Category::General);

    let effort = match (severity, category) {
        (Level::High, _) => Level::High,
        (_, Category::WalletIntegration | Category::Authentication) => Level::High,
        (_, Category::MobileUx) => Level::Medium,
        _ => Level::Low,
    };

    let length = description.chars().count();
    let confidence = if length > 100 && contains_any(DETAIL_MARKERS) {
        Level::High
    } else if length < 50 {
        Level::Low
    } else {
        Level::Medium
    };

    BugAnalysis {
        severity,
        priority,
        category,
        effort,
        confidence,
    }
}
