//! Claim desk bot
//!
//! Polls the transport, routes every event through the [`Dispatcher`] and
//! delivers the resulting messages. A failure on one event or one send is
//! logged and the loop keeps going; only a closed transport or the shutdown
//! signal ends it.

use super::dispatcher::Dispatcher;
use super::traits::*;
use crate::ledger::LedgerError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ClaimBot<C: ChatClient> {
    client: C,
    dispatcher: Dispatcher,
    poll_interval: Duration,
}

impl<C: ChatClient> ClaimBot<C> {
    pub fn new(client: C, dispatcher: Dispatcher) -> Self {
        Self {
            client,
            dispatcher,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run until Ctrl-C or until the transport closes.
    pub async fn run(&self) -> ChatResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes or the transport closes, then flush
    /// the ledger.
    pub async fn run_until<S>(&self, shutdown: S) -> ChatResult<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.poll_interval);

        info!("bot event loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    let events = match self.client.receive_messages().await {
                        Ok(events) => events,
                        Err(ChatError::Closed) => {
                            info!("transport closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "error receiving messages, will retry");
                            continue;
                        }
                    };

                    for event in events {
                        self.handle_event(&event).await;
                    }
                }
            }
        }

        if let Err(e) = self.dispatcher.ledger().flush().await {
            error!(error = %e, "final ledger flush failed");
        }
        Ok(())
    }

    /// Dispatch one event and deliver everything it produced.
    pub async fn handle_event(&self, event: &InboundEvent) {
        for outbound in self.dispatcher.handle(event).await {
            self.deliver(outbound).await;
        }
    }

    async fn deliver(&self, outbound: Outbound) {
        let chat = match &outbound.target {
            Target::Chat(chat) => chat.clone(),
            Target::Direct(user) => ChatId::from(user),
            Target::Admin => match self.dispatcher.admin() {
                Some(admin) => ChatId::from(admin),
                None => {
                    debug!("no admin configured, notice dropped");
                    return;
                }
            },
        };

        if let Err(e) = self
            .client
            .send_message(&chat, &outbound.text, outbound.format)
            .await
        {
            if outbound.is_admin_notice() {
                let failure = LedgerError::AdminNotifyFailure(e.to_string());
                warn!(error = %failure, "admin notice not delivered");
            } else {
                warn!(chat = %chat, error = %e, "failed to deliver message");
            }
        }
    }
}
