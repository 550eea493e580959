//! Inbound event routing
//!
//! `Dispatcher::handle` classifies one event, runs the privacy gate and the
//! ledger operation it selects, and returns what should be sent. It never
//! touches the transport, so every route is testable without one.

use super::classifier::{classify, Intent, Topic};
use super::commands::{parse_command, Command};
use super::replies;
use super::traits::{InboundEvent, Outbound};
use crate::gatekeeper::{analyze_report, guard, GateDecision, PayloadKind};
use crate::ledger::request::{mask_wallet, RequestId, RequestStatus, UserId};
use crate::ledger::{Ledger, Requester};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Receives notices and may run admin commands. `None` disables both.
    pub admin: Option<UserId>,
    /// Where /generate_distribution writes the approved wallet list.
    pub distribution_path: PathBuf,
}

/// Senders remembered for the first-contact welcome.
pub const SEEN_USERS_CAPACITY: usize = 10_000;

/// Recently seen senders, oldest evicted first once `capacity` is reached.
///
/// An evicted user who writes again without a request is welcomed again.
#[derive(Debug)]
struct SeenUsers {
    members: HashSet<UserId>,
    order: VecDeque<UserId>,
    capacity: usize,
}

impl SeenUsers {
    fn new(capacity: usize) -> Self {
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record `user`; true if it was not already remembered.
    fn insert(&mut self, user: &UserId) -> bool {
        if self.members.contains(user) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.members.insert(user.clone());
        self.order.push_back(user.clone());
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

pub struct Dispatcher {
    ledger: Arc<Ledger>,
    config: DispatcherConfig,
    seen_users: Mutex<SeenUsers>,
}

impl Dispatcher {
    pub fn new(ledger: Arc<Ledger>, config: DispatcherConfig) -> Self {
        Self {
            ledger,
            config,
            seen_users: Mutex::new(SeenUsers::new(SEEN_USERS_CAPACITY)),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn admin(&self) -> Option<&UserId> {
        self.config.admin.as_ref()
    }

    pub fn is_admin(&self, user: &UserId) -> bool {
        self.config.admin.as_ref() == Some(user)
    }

    /// Route one event and return the messages to send.
    pub async fn handle(&self, event: &InboundEvent) -> Vec<Outbound> {
        let first_contact = self.seen_users.lock().await.insert(&event.sender.id);
        let intent = classify(&event.text, event.is_shared);
        debug!(
            user_id = %event.sender.id,
            shared = event.is_shared,
            intent = intent_kind(&intent),
            "event classified"
        );

        match intent {
            Intent::Command { name, args } => {
                self.handle_command(event, parse_command(&name, &args)).await
            }
            Intent::WalletCandidate(address) => self.handle_wallet(event, &address).await,
            Intent::BugReportCandidate(text) => self.handle_bug_report(event, &text),
            Intent::ConversationalIntent(topic) => {
                self.handle_chatter(event, Some(topic), first_contact).await
            }
            Intent::Fallback => self.handle_chatter(event, None, first_contact).await,
        }
    }

    /// Admin notice, or nothing when no admin is configured.
    fn admin_notice(&self, text: String) -> Option<Outbound> {
        self.config.admin.as_ref().map(|_| Outbound::admin(text))
    }

    async fn handle_wallet(&self, event: &InboundEvent, address: &str) -> Vec<Outbound> {
        let reply_to = &event.channel_id;

        if let GateDecision::Defer(masked) = guard(event.is_shared, PayloadKind::Wallet, address) {
            info!(
                user_id = %event.sender.id,
                wallet = %masked,
                "wallet shared in group, not recorded"
            );
            return vec![Outbound::reply(reply_to, replies::wallet_deferred(&masked))];
        }

        let requester = Requester {
            user_id: event.sender.id.clone(),
            username: event.sender.username.clone(),
            display_name: event.sender.display_name.clone(),
        };

        match self.ledger.submit(requester, address).await {
            Ok(request) => {
                let mut out = vec![Outbound::reply(reply_to, replies::submitted(&request))];
                out.extend(self.admin_notice(replies::admin_new_request(&request)));
                out
            }
            Err(e) => {
                info!(
                    user_id = %event.sender.id,
                    wallet = %mask_wallet(address),
                    error = %e,
                    "token request refused"
                );
                vec![Outbound::reply(reply_to, replies::ledger_error(&e))]
            }
        }
    }

    fn handle_bug_report(&self, event: &InboundEvent, description: &str) -> Vec<Outbound> {
        let reply_to = &event.channel_id;

        if let GateDecision::Defer(summary) =
            guard(event.is_shared, PayloadKind::BugReport, description)
        {
            info!(user_id = %event.sender.id, "detailed report in group, deferred");
            return vec![Outbound::reply(reply_to, replies::report_deferred(&summary))];
        }

        let analysis = analyze_report(description);
        info!(
            user_id = %event.sender.id,
            severity = %analysis.severity,
            category = %analysis.category,
            "bug report received"
        );

        let mut out = vec![Outbound::reply(
            reply_to,
            replies::bug_ack(&event.sender, description),
        )];
        out.extend(self.admin_notice(replies::admin_bug_report(
            &event.sender,
            description,
            &analysis,
        )));
        out
    }

    async fn handle_chatter(
        &self,
        event: &InboundEvent,
        topic: Option<Topic>,
        first_contact: bool,
    ) -> Vec<Outbound> {
        let reply_to = &event.channel_id;

        if first_contact && self.ledger.lookup_user(&event.sender.id).await.is_none() {
            return vec![Outbound::reply(reply_to, replies::welcome(&event.sender))];
        }

        let text = match topic {
            Some(topic) => replies::topic_reply(topic, &event.sender),
            None => replies::fallback(&event.sender),
        };
        vec![Outbound::reply(reply_to, text)]
    }

    async fn handle_command(&self, event: &InboundEvent, command: Command) -> Vec<Outbound> {
        let reply_to = &event.channel_id;
        let is_admin = self.is_admin(&event.sender.id);

        if command.requires_admin() && !is_admin {
            info!(user_id = %event.sender.id, command = ?command, "admin command refused");
            return vec![Outbound::reply(reply_to, replies::admin_only())];
        }
        if command.requires_dm() && event.is_shared {
            return vec![Outbound::reply(reply_to, replies::dm_only())];
        }

        let text = match command {
            Command::Start => replies::start(&event.sender),
            Command::Help => replies::help(is_admin),
            Command::Tokens => replies::tokens_info(),
            Command::Report => replies::report_info(),
            Command::Privacy => replies::privacy_info(),
            Command::Status => {
                let request = self.ledger.lookup_user(&event.sender.id).await;
                replies::own_status(request.as_ref())
            }
            Command::Pending => replies::pending_list(&self.ledger.list_pending().await),
            Command::Approved => {
                replies::approved_list(&self.ledger.list_approved_decided().await)
            }
            Command::Approve { request_id } => {
                return self
                    .decide(event, &request_id, RequestStatus::Approved)
                    .await
            }
            Command::Reject { request_id } => {
                return self
                    .decide(event, &request_id, RequestStatus::Rejected)
                    .await
            }
            Command::GenerateDistribution => {
                let path = &self.config.distribution_path;
                match self.ledger.export_distribution(path).await {
                    Ok(count) => replies::distribution_written(count, path),
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "distribution export failed");
                        replies::ledger_error(&e)
                    }
                }
            }
            Command::Stats => {
                replies::stats(&self.ledger.stats().await, self.ledger.is_degraded())
            }
            Command::Usage(syntax) => replies::usage(syntax),
            Command::Unknown(name) => replies::unknown_command(&name),
        };
        vec![Outbound::reply(reply_to, text)]
    }

    async fn decide(
        &self,
        event: &InboundEvent,
        request_id: &RequestId,
        status: RequestStatus,
    ) -> Vec<Outbound> {
        let reply_to = &event.channel_id;
        match self.ledger.transition(request_id, status).await {
            Ok(request) => vec![
                Outbound::reply(reply_to, replies::decision_confirmed(&request)),
                Outbound::direct(&request.user_id, replies::decision_notice(&request)),
            ],
            Err(e) => {
                info!(request_id = %request_id, error = %e, "decision refused");
                vec![Outbound::reply(reply_to, replies::ledger_error(&e))]
            }
        }
    }
}

fn intent_kind(intent: &Intent) -> &'static str {
    match intent {
        Intent::Command { .. } => "command",
        Intent::WalletCandidate(_) => "wallet",
        Intent::BugReportCandidate(_) => "bug_report",
        Intent::ConversationalIntent(_) => "conversational",
        Intent::Fallback => "fallback",
    }
}
