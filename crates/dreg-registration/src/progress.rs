//! Progress tracking and callbacks for registration runs.
//!
//! Progress is counted in finished blocks. Blocks may finish on any worker
//! thread, so trackers and callbacks are shared behind `Arc`s.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::base::BlockRegStatus;

/// Progress information after a block finished.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Number of blocks finished so far.
    pub blocks_completed: usize,
    /// Number of blocks scheduled.
    pub total_blocks: usize,
    /// Number of finished blocks that failed.
    pub failures: usize,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Estimated remaining time.
    pub estimated_remaining: Option<Duration>,
    /// Chunk index (NumPy order) and status of the block that just finished.
    pub last_block: Option<(Vec<usize>, BlockRegStatus)>,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(blocks_completed: usize, total_blocks: usize, failures: usize, elapsed: Duration) -> Self {
        Self {
            blocks_completed,
            total_blocks,
            failures,
            elapsed,
            estimated_remaining: None,
            last_block: None,
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> f64 {
        if self.total_blocks == 0 {
            return 100.0;
        }
        (self.blocks_completed as f64 / self.total_blocks as f64) * 100.0
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if self.blocks_completed > 0 {
            let avg_time_per_block = self.elapsed.as_secs_f64() / self.blocks_completed as f64;
            let remaining = self.total_blocks.saturating_sub(self.blocks_completed);
            self.estimated_remaining = Some(Duration::from_secs_f64(avg_time_per_block * remaining as f64));
        }
    }
}

/// Progress callback trait for monitoring registration progress.
pub trait ProgressCallback: Send + Sync {
    /// Called every time a block finishes.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when block registration starts.
    fn on_start(&self, _total_blocks: usize) {}

    /// Called when all blocks are reduced into a transform.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when the run fails.
    fn on_error(&self, _error: &str) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log every `log_interval` finished blocks.
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 1 }
    }
}

impl ConsoleProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.blocks_completed % self.log_interval == 0 || info.blocks_completed == info.total_blocks {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "Block {}/{} ({:.1}%) | Failures: {} | Elapsed: {:.2}s | ETA: {}",
                info.blocks_completed,
                info.total_blocks,
                info.progress_percent(),
                info.failures,
                info.elapsed.as_secs_f64(),
                remaining
            );
        }
    }

    fn on_start(&self, total_blocks: usize) {
        tracing::info!("Registering {} blocks", total_blocks);
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Registration completed in {:.2}s with {}/{} blocks failed",
            info.elapsed.as_secs_f64(),
            info.failures,
            info.total_blocks
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info.clone());
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    start_time: Option<Instant>,
    total_blocks: usize,
    completed: usize,
    failures: usize,
}

impl TrackerState {
    fn info(&self) -> ProgressInfo {
        let elapsed = self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
        let mut info = ProgressInfo::new(self.completed, self.total_blocks, self.failures, elapsed);
        info.calculate_remaining();
        info
    }
}

/// Progress tracker that manages multiple callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    state: Arc<Mutex<TrackerState>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Reset counters and start the clock.
    pub fn start(&self, total_blocks: usize) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = TrackerState {
                start_time: Some(Instant::now()),
                total_blocks,
                ..TrackerState::default()
            };
        }
        for callback in &self.callbacks {
            callback.on_start(total_blocks);
        }
    }

    /// Record a finished block.
    pub fn block_finished(&self, chunk_index: &[usize], status: BlockRegStatus) {
        let mut info = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.completed += 1;
            if status == BlockRegStatus::Failure {
                state.failures += 1;
            }
            state.info()
        };
        info.last_block = Some((chunk_index.to_vec(), status));

        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Snapshot of the current progress.
    pub fn info(&self) -> ProgressInfo {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).info()
    }

    pub fn complete(&self) {
        let info = self.info();
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
