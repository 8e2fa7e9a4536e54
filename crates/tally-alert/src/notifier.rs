use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::transport::Transport;

/// Cooldown-gated sender. One window is shared by every condition, and it
/// starts when an attempt is made, whether or not delivery succeeds.
#[derive(Debug)]
pub struct Notifier<T> {
    transport: T,
    cooldown: Duration,
    last_sent: Option<Instant>,
}

impl<T: Transport> Notifier<T> {
    pub fn new(transport: T, cooldown: Duration) -> Self {
        Self { transport, cooldown, last_sent: None }
    }

    pub fn attempt(&mut self, condition: &str, message: &str) -> bool {
        self.attempt_at(Instant::now(), condition, message)
    }

    pub fn attempt_at(&mut self, now: Instant, condition: &str, message: &str) -> bool {
        if let Some(t) = self.last_sent {
            if now.saturating_duration_since(t) < self.cooldown {
                debug!(condition, "notify: cooldown active, skipped");
                return false;
            }
        }

        let body = if message.trim().is_empty() {
            warn!(condition, "notify: empty body, using default");
            format!("Alert triggered for: {}. (Original body was unexpectedly empty)", condition)
        } else {
            message.to_string()
        };

        self.last_sent = Some(now);
        match self.transport.deliver(condition, &body) {
            Ok(()) => {
                info!(condition, "notify: delivered");
                true
            }
            Err(e) => {
                warn!(condition, "notify: delivery failed: {:#}", e);
                false
            }
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
