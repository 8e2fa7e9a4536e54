pub mod doctor;
pub mod notifier;
pub mod transport;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tally_vision::annotate::{DrawOp, Rgb};
use tally_vision::Detection;
use tracing::info;

pub use notifier::Notifier;
pub use transport::{DeliveryError, LogTransport, MemoryTransport, SpoolTransport, Transport};

pub const CAPACITY_SUBJECT: &str = "Capacity Alert";
pub const RESTRICTED_SUBJECT: &str = "Restricted Item Alert";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub capacity: i64,
    pub cooldown_s: f64,
    /// Class names that must not appear, matched case-insensitively.
    pub restricted: Vec<String>,
    /// When set, alerts are appended here as JSON lines instead of logged.
    pub spool_path: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { capacity: 10, cooldown_s: 10.0, restricted: Vec::new(), spool_path: None }
    }
}

impl AlertConfig {
    /// Cooldown window; errors on negative, NaN, or values a `Duration` cannot hold.
    pub fn cooldown(&self) -> Result<Duration> {
        anyhow::ensure!(
            self.cooldown_s >= 0.0,
            "alert.cooldown_s must be >= 0 (got {})",
            self.cooldown_s
        );
        Duration::try_from_secs_f64(self.cooldown_s)
            .with_context(|| format!("alert.cooldown_s out of range: {}", self.cooldown_s))
    }
}

/// Conditions holding on the current frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertStatus {
    pub capacity_exceeded: bool,
    pub restricted: Vec<String>,
    pub draw: Vec<DrawOp>,
}

impl AlertStatus {
    /// Operator banner; capacity wins over restricted items.
    pub fn banner(&self) -> Option<&'static str> {
        if self.capacity_exceeded {
            Some("CAPACITY EXCEEDED!")
        } else if !self.restricted.is_empty() {
            Some("UNAUTHORIZED ITEM DETECTED!")
        } else {
            None
        }
    }
}

/// Labels from `dets` whose lowercase form is in `restricted_lower`, in
/// first-seen order, without repeats.
pub fn restricted_labels(dets: &[Detection], restricted_lower: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for d in dets {
        let lower = d.label.to_lowercase();
        if restricted_lower.iter().any(|r| *r == lower) && !found.contains(&d.label) {
            found.push(d.label.clone());
        }
    }
    found
}

/// Latches capacity and restricted-item conditions so each fires one
/// notification per episode. A latch is only set by a successful delivery
/// and clears once its condition stops holding.
#[derive(Debug)]
pub struct AlertManager<T> {
    capacity: i64,
    restricted: Vec<String>,
    notifier: Notifier<T>,
    capacity_latched: bool,
    restricted_latched: bool,
}

impl<T: Transport> AlertManager<T> {
    pub fn new(cfg: &AlertConfig, transport: T) -> Result<Self> {
        let cooldown = cfg.cooldown()?;
        let restricted = cfg
            .restricted
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            capacity: cfg.capacity,
            restricted,
            notifier: Notifier::new(transport, cooldown),
            capacity_latched: false,
            restricted_latched: false,
        })
    }

    pub fn capacity(&self) -> i64 { self.capacity }

    pub fn restricted(&self) -> &[String] { &self.restricted }

    pub fn notifier(&self) -> &Notifier<T> { &self.notifier }

    pub fn evaluate(&mut self, total: i64, dets: &[Detection]) -> AlertStatus {
        self.evaluate_at(Instant::now(), total, dets)
    }

    pub fn evaluate_at(&mut self, now: Instant, total: i64, dets: &[Detection]) -> AlertStatus {
        let mut status = AlertStatus::default();

        status.capacity_exceeded = self.check_capacity_at(now, total);
        if status.capacity_exceeded {
            status.draw.push(DrawOp::text(50, 50, "CAPACITY EXCEEDED!", Rgb::RED, 1.5));
        }

        status.restricted = self.check_restricted_at(now, dets);
        if !status.restricted.is_empty() {
            status.draw.push(DrawOp::text(50, 100, "RESTRICTED ITEM DETECTED!", Rgb::ORANGE, 1.2));
        }
        status
    }

    pub fn check_capacity_at(&mut self, now: Instant, total: i64) -> bool {
        if total <= self.capacity {
            self.capacity_latched = false;
            return false;
        }
        if !self.capacity_latched {
            let body = format!(
                "Alert Type: Capacity Exceeded\n\nDetails: \
                 Current count of {} has exceeded the set capacity of {}.",
                total, self.capacity
            );
            if self.notifier.attempt_at(now, CAPACITY_SUBJECT, &body) {
                self.capacity_latched = true;
            }
        }
        true
    }

    pub fn check_restricted_at(&mut self, now: Instant, dets: &[Detection]) -> Vec<String> {
        let found = restricted_labels(dets, &self.restricted);
        if found.is_empty() {
            self.restricted_latched = false;
            return found;
        }
        if !self.restricted_latched {
            info!(labels = ?found, "alert: restricted items in view");
            let body = format!(
                "Alert Type: Restricted Item\n\nDetails: \
                 The following restricted item(s) were detected: {}.",
                found.join(", ")
            );
            if self.notifier.attempt_at(now, RESTRICTED_SUBJECT, &body) {
                self.restricted_latched = true;
            }
        }
        found
    }
}
