//! Application state management

use ragent_core::config::AppConfig;
use ragent_parser::ParserRegistry;
use ragent_rag::{AnswerAssembler, Retriever};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Retrieval pipeline
    pub retriever: Arc<Retriever>,
    /// Answer generation
    pub assembler: Arc<AnswerAssembler>,
    /// Document parsers by file type
    pub parsers: ParserRegistry,
}

impl AppState {
    /// Create application state over a retriever and assembler
    pub fn new(config: AppConfig, retriever: Arc<Retriever>, assembler: Arc<AnswerAssembler>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            retriever,
            assembler,
            parsers: ParserRegistry::with_defaults(),
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

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
