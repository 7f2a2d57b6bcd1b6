//! Metrics Collection
//!
//! Counters for the responder, reported periodically in the status log line.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Metrics collector for the responder
#[derive(Debug)]
pub struct Metrics {
    /// Start time for uptime calculation
    started_at: DateTime<Utc>,

    /// DNS messages handled
    pub queries: AtomicU64,

    /// Questions skipped (unsupported type, unknown name shape)
    pub skipped_questions: AtomicU64,

    /// Questions rejected by the token check
    pub auth_failures: AtomicU64,

    /// Set operations applied to the registry
    pub sets: AtomicU64,

    /// Get operations answered from the registry
    pub gets: AtomicU64,

    /// Get operations for keys that were never set
    pub get_misses: AtomicU64,

    /// Answer records produced
    pub answers: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub queries: u64,
    pub skipped_questions: u64,
    pub auth_failures: u64,
    pub sets: u64,
    pub gets: u64,
    pub get_misses: u64,
    pub answers: u64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            queries: AtomicU64::new(0),
            skipped_questions: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            get_misses: AtomicU64::new(0),
            answers: AtomicU64::new(0),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn inc_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped_questions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_auth_failures(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sets(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_gets(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_get_misses(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_answers(&self, count: u64) {
        self.answers.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            queries: self.queries.load(Ordering::Relaxed),
            skipped_questions: self.skipped_questions.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            answers: self.answers.load(Ordering::Relaxed),
        }
    }
}
