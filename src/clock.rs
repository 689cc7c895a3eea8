use instant::{Duration, Instant};

/// Frame clock. Each call to [`Clock::delta`] returns the time elapsed since
/// the previous call. A clock made with [`Clock::new`] starts on its first
/// call, which returns zero.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    last: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self { last: None }
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { last: Some(start) }
    }

    pub fn is_running(&self) -> bool {
        self.last.is_some()
    }

    pub fn delta(&mut self) -> Duration {
        self.delta_at(Instant::now())
    }

    /// Like [`Clock::delta`] but with an explicit timestamp. Timestamps older
    /// than the previous one yield zero.
    pub fn delta_at(&mut self, now: Instant) -> Duration {
        let Some(last) = self.last else {
            self.last = Some(now);
            return Duration::ZERO;
        };
        if now <= last {
            return Duration::ZERO;
        }
        self.last = Some(now);
        now.duration_since(last)
    }
}
