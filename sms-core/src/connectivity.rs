//! Router connectivity tracking.
//!
//! Judges whether the router is reachable from the outcomes of remote calls.
//! Time is passed in as unix seconds so the tracker stays pure.

use serde::Serialize;

/// Consecutive failures after which the router is considered offline.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Seconds without a success after which the router is considered offline.
pub const DEFAULT_OFFLINE_TIMEOUT_SECS: u64 = 900;

/// Derived connectivity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Recent calls succeed.
    Online,
    /// No success yet, too many failures, or the last success is stale.
    Offline,
}

/// Success/failure bookkeeping for remote calls.
#[derive(Debug, Clone)]
pub struct DeviceConnectivity {
    last_success: Option<u64>,
    consecutive_failures: u32,
    last_error: Option<String>,
    total_operations: u64,
    successful_operations: u64,
    failure_threshold: u32,
    offline_timeout_secs: u64,
}

impl DeviceConnectivity {
    /// Tracker with the default thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(DEFAULT_FAILURE_THRESHOLD, DEFAULT_OFFLINE_TIMEOUT_SECS)
    }

    /// Tracker with custom thresholds.
    pub fn with_thresholds(failure_threshold: u32, offline_timeout_secs: u64) -> Self {
        Self {
            last_success: None,
            consecutive_failures: 0,
            last_error: None,
            total_operations: 0,
            successful_operations: 0,
            failure_threshold: failure_threshold.max(1),
            offline_timeout_secs,
        }
    }

    /// Record a successful remote call.
    pub fn record_success(&mut self, now: u64) {
        self.last_success = Some(now);
        self.consecutive_failures = 0;
        self.last_error = None;
        self.total_operations += 1;
        self.successful_operations += 1;
    }

    /// Record a failed remote call.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.into());
        self.total_operations += 1;
    }

    /// Current status.
    pub fn status(&self, now: u64) -> Connectivity {
        let Some(last) = self.last_success else {
            return Connectivity::Offline;
        };
        if self.consecutive_failures >= self.failure_threshold {
            return Connectivity::Offline;
        }
        if now.saturating_sub(last) > self.offline_timeout_secs {
            return Connectivity::Offline;
        }
        Connectivity::Online
    }

    /// Consecutive failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Serializable snapshot for REST and MQTT.
    pub fn report(&self, now: u64) -> ConnectivityReport {
        ConnectivityReport {
            status: self.status(now),
            consecutive_failures: self.consecutive_failures,
            total_operations: self.total_operations,
            successful_operations: self.successful_operations,
            last_error: self.last_error.clone(),
            last_seen: self.last_success,
            seconds_since_last_success: self.last_success.map(|t| now.saturating_sub(t)),
        }
    }
}

impl Default for DeviceConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Connectivity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    /// Derived status.
    pub status: Connectivity,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// All recorded calls.
    pub total_operations: u64,
    /// Successful calls.
    pub successful_operations: u64,
    /// Last failure message, cleared on success.
    pub last_error: Option<String>,
    /// Unix time of the last success.
    pub last_seen: Option<u64>,
    /// Seconds since the last success.
    pub seconds_since_last_success: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_until_first_success() {
        let tracker = DeviceConnectivity::new();
        assert_eq!(tracker.status(100), Connectivity::Offline);
    }

    #[test]
    fn online_after_success() {
        let mut tracker = DeviceConnectivity::new();
        tracker.record_success(100);
        assert_eq!(tracker.status(101), Connectivity::Online);
    }

    #[test]
    fn tolerates_failures_below_threshold() {
        let mut tracker = DeviceConnectivity::new();
        tracker.record_success(100);
        tracker.record_failure("timeout");
        tracker.record_failure("timeout");
        assert_eq!(tracker.status(110), Connectivity::Online);

        tracker.record_failure("timeout");
        assert_eq!(tracker.status(110), Connectivity::Offline);
    }

    #[test]
    fn success_resets_failures() {
        let mut tracker = DeviceConnectivity::new();
        tracker.record_failure("a");
        tracker.record_failure("b");
        tracker.record_failure("c");
        tracker.record_success(200);
        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(tracker.status(200), Connectivity::Online);
        assert_eq!(tracker.report(200).last_error, None);
    }

    #[test]
    fn stale_success_is_offline() {
        let mut tracker = DeviceConnectivity::with_thresholds(3, 60);
        tracker.record_success(1000);
        assert_eq!(tracker.status(1060), Connectivity::Online);
        assert_eq!(tracker.status(1061), Connectivity::Offline);
    }

    #[test]
    fn report_counts_operations() {
        let mut tracker = DeviceConnectivity::new();
        tracker.record_success(10);
        tracker.record_failure("boom");
        let report = tracker.report(25);
        assert_eq!(report.total_operations, 2);
        assert_eq!(report.successful_operations, 1);
        assert_eq!(report.last_error.as_deref(), Some("boom"));
        assert_eq!(report.seconds_since_last_success, Some(15));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "online");
    }
}
