//! Admission control for the Breathwise gateway.
//!
//! Sliding-window request budgets per caller and endpoint class. Each
//! (caller, class) pair keeps the timestamps of its admitted requests
//! inside the window; a request is admitted while fewer than the class's
//! budget remain. State is sharded, so unrelated callers never contend.

use breathwise_config::{AdmissionConfig, BudgetConfig};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Endpoint families with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Administrative and credential-bearing endpoints.
    Auth,
    /// Cheap reads.
    Read,
    /// Endpoints that may fan out to upstream providers.
    Compute,
}

impl EndpointClass {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointClass::Auth => "auth",
            EndpointClass::Read => "read",
            EndpointClass::Compute => "compute",
        }
    }
}

/// CORS pre-flight requests are answered but never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Preflight,
    Regular,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// When rejected: time until the oldest in-window request expires.
    pub retry_after: Option<Duration>,
    /// Requests left in the current window after this one.
    pub remaining: u32,
}

impl Decision {
    /// Retry-after rounded up to whole seconds, at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            secs.max(1)
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    max_requests: u32,
    window: Duration,
}

impl From<&BudgetConfig> for Budget {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
        }
    }
}

pub struct AdmissionController {
    auth: Budget,
    read: Budget,
    compute: Budget,
    windows: DashMap<(String, EndpointClass), VecDeque<Instant>>,
    sweep_interval: Duration,
}

impl AdmissionController {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            auth: Budget::from(&config.auth),
            read: Budget::from(&config.read),
            compute: Budget::from(&config.compute),
            windows: DashMap::new(),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    fn budget(&self, class: EndpointClass) -> Budget {
        match class {
            EndpointClass::Auth => self.auth,
            EndpointClass::Read => self.read,
            EndpointClass::Compute => self.compute,
        }
    }

    /// Check and, if admitted, count a regular request.
    pub fn allow(&self, caller: &str, class: EndpointClass) -> Decision {
        self.check(caller, class, RequestKind::Regular)
    }

    pub fn check(&self, caller: &str, class: EndpointClass, kind: RequestKind) -> Decision {
        let budget = self.budget(class);
        let now = Instant::now();

        if kind == RequestKind::Preflight {
            let used = self
                .windows
                .get(&(caller.to_string(), class))
                .map(|w| w.iter().filter(|t| now.duration_since(**t) < budget.window).count())
                .unwrap_or(0);
            return Decision {
                allowed: true,
                retry_after: None,
                remaining: budget.max_requests.saturating_sub(used as u32),
            };
        }

        let mut window = self.windows.entry((caller.to_string(), class)).or_default();
        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= budget.window)
        {
            window.pop_front();
        }

        let used = window.len() as u32;
        if used >= budget.max_requests {
            let retry_after = window
                .front()
                .map(|oldest| budget.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(budget.window);
            warn!(
                caller = %caller.chars().take(20).collect::<String>(),
                class = class.as_str(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Admission denied"
            );
            return Decision {
                allowed: false,
                retry_after: Some(retry_after),
                remaining: 0,
            };
        }

        window.push_back(now);
        Decision {
            allowed: true,
            retry_after: None,
            remaining: budget.max_requests - used - 1,
        }
    }

    /// Drop windows whose requests have all expired.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|(_, class), window| {
            let budget = self.budget(*class);
            window
                .back()
                .is_some_and(|t| now.duration_since(*t) < budget.window)
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "Swept idle admission windows");
        }
        removed
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(&AdmissionConfig::default())
    }
}
