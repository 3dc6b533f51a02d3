//! Application state management
//!
//! Author: facelog maintainers

use facelog_core::{AppConfig, DetectionService};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Holds no per-request data; the service is the only path to the store.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Validation and orchestration layer
    pub service: Arc<dyn DetectionService>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Responses with a 4xx status
    pub client_errors: AtomicU64,
    /// Responses with a 5xx status
    pub server_errors: AtomicU64,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, service: Arc<dyn DetectionService>) -> Self {
        Self {
            config,
            service,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Record the status class of a finished response
    pub fn record_status(&self, status: u16) {
        match status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::SeqCst);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
