//! Claim desk - token request desk for community testing programs
//!
//! A chat bot front-end over a small request ledger:
//! - one token request per user, one live request per wallet
//! - requests move `pending -> approved | rejected` by admin action
//! - approved wallets are exported for an external distribution step
//! - wallet addresses and long reports are never processed in group chats
//!
//! Modules, leaves first: `persistence` (durable ledger document),
//! `ledger` (invariants and transitions), `gatekeeper` (privacy gate and
//! report triage), `chat` (classification, routing and the bot loop).

pub mod chat;
pub mod gatekeeper;
pub mod ledger;
pub mod persistence;
