use crate::core::constants::{
    FETCH_HARD_DEADLINE_MS, FETCH_SOFT_DEADLINE_MS, MIN_ASYNC_FETCHES_PER_FRAME,
    MIN_SYNC_READS_PER_FRAME,
};
use instant::Instant;
use std::time::Duration;

/// Per-frame budget for cache reads and fetch requests.
///
/// Before the soft deadline everything is allowed. Between the soft and hard
/// deadlines a frame may still do a small minimum of work (counted only from
/// the moment the soft deadline passed). After the hard deadline nothing is
/// allowed.
#[derive(Debug, Clone)]
pub struct FetchQuota {
    start: Instant,
    soft: Duration,
    hard: Duration,
    late_sync_reads: u32,
    late_async_fetches: u32,
    sync_reads: u32,
    async_fetches: u32,
}

impl FetchQuota {
    /// Quota with the standard deadlines, starting now
    pub fn starting_now() -> Self {
        Self::with_deadlines(
            Instant::now(),
            Duration::from_millis(FETCH_SOFT_DEADLINE_MS),
            Duration::from_millis(FETCH_HARD_DEADLINE_MS),
        )
    }

    pub fn with_deadlines(start: Instant, soft: Duration, hard: Duration) -> Self {
        Self {
            start,
            soft,
            hard,
            late_sync_reads: 0,
            late_async_fetches: 0,
            sync_reads: 0,
            async_fetches: 0,
        }
    }

    /// A quota that never runs out
    pub fn unlimited() -> Self {
        Self::with_deadlines(Instant::now(), Duration::MAX, Duration::MAX)
    }

    /// Whether one more synchronous cache read fits in this frame
    pub fn try_sync_read(&mut self) -> bool {
        let allowed = match self.phase() {
            Phase::Early => true,
            Phase::Late => {
                let ok = self.late_sync_reads < MIN_SYNC_READS_PER_FRAME;
                if ok {
                    self.late_sync_reads += 1;
                }
                ok
            }
            Phase::Over => false,
        };
        if allowed {
            self.sync_reads += 1;
        }
        allowed
    }

    /// Whether one more asynchronous fetch may be issued this frame
    pub fn try_async_fetch(&mut self) -> bool {
        let allowed = match self.phase() {
            Phase::Early => true,
            Phase::Late => {
                let ok = self.late_async_fetches < MIN_ASYNC_FETCHES_PER_FRAME;
                if ok {
                    self.late_async_fetches += 1;
                }
                ok
            }
            Phase::Over => false,
        };
        if allowed {
            self.async_fetches += 1;
        }
        allowed
    }

    /// Past the hard deadline: no further work of any kind this frame
    pub fn is_exhausted(&self) -> bool {
        self.phase() == Phase::Over
    }

    /// Synchronous reads granted so far
    pub fn sync_reads(&self) -> u32 {
        self.sync_reads
    }

    /// Async fetches granted so far
    pub fn async_fetches(&self) -> u32 {
        self.async_fetches
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn phase(&self) -> Phase {
        let elapsed = self.start.elapsed();
        if elapsed >= self.hard {
            Phase::Over
        } else if elapsed >= self.soft {
            Phase::Late
        } else {
            Phase::Early
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Early,
    Late,
    Over,
}
