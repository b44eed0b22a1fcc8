/// Target health probing, following the target group health check policy
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::graph::models::HealthCheck;
use crate::utils::polling::PollingConfig;

/// Health state of a single target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Initial,
    Healthy,
    Unhealthy,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Initial => write!(f, "initial"),
            TargetState::Healthy => write!(f, "healthy"),
            TargetState::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Counts consecutive probe results against the thresholds
#[derive(Debug, Clone)]
pub struct HealthTracker {
    healthy_threshold: u32,
    unhealthy_threshold: u32,
    successes: u32,
    failures: u32,
    state: TargetState,
}

impl HealthTracker {
    pub fn new(check: &HealthCheck) -> Self {
        Self {
            healthy_threshold: check.healthy_threshold.max(1),
            unhealthy_threshold: check.unhealthy_threshold.max(1),
            successes: 0,
            failures: 0,
            state: TargetState::Initial,
        }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Record one probe result and return the resulting state
    pub fn record(&mut self, success: bool) -> TargetState {
        if success {
            self.successes += 1;
            self.failures = 0;
            if self.successes >= self.healthy_threshold {
                self.state = TargetState::Healthy;
            }
        } else {
            self.failures += 1;
            self.successes = 0;
            if self.failures >= self.unhealthy_threshold {
                self.state = TargetState::Unhealthy;
            }
        }
        self.state
    }
}

/// Probes one target the way the load balancer would
pub struct HealthProber {
    client: Client,
    url: Url,
    check: HealthCheck,
    interval: Duration,
}

impl HealthProber {
    /// Create a prober for `target`, probing at the health check path
    pub fn new(target: &Url, check: HealthCheck) -> Result<Self> {
        let url = target
            .join(&check.path)
            .with_context(|| format!("Invalid health check path: {}", check.path))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(check.timeout_secs as u64))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            interval: Duration::from_secs(check.interval_secs as u64),
            check,
        })
    }

    /// Probe more often than the declared interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// One probe; only a 200 counts as success
    pub async fn probe_once(&self) -> bool {
        match self.client.get(self.url.clone()).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                debug!("Probe {} returned {}", self.url, response.status());
                false
            }
            Err(e) => {
                debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }

    /// Probe until the target is decided healthy or unhealthy
    pub async fn run(&self, max_wait: Duration) -> Result<TargetState> {
        let tracker = Mutex::new(HealthTracker::new(&self.check));
        let polling = PollingConfig::new(
            max_wait,
            self.interval,
            format!("Probing {}", self.url),
        );

        polling
            .poll(|| {
                let tracker = &tracker;
                async move {
                    let success = self.probe_once().await;
                    let mut tracker = tracker.lock().await;
                    tracker.record(success);
                    let state = tracker.state();
                    debug!("Probe {}: success={} state={}", self.url, success, state);
                    Ok(match state {
                        TargetState::Initial => None,
                        decided => Some(decided),
                    })
                }
            })
            .await
    }
}
