use std::time::Instant;

/// Logs how long a scope took when dropped. `stop` returns the elapsed
/// seconds instead, for callers that feed the number into metrics.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    armed: bool,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            armed: true,
        }
    }

    pub fn stop(mut self) -> f64 {
        self.armed = false;
        let secs = self.start.elapsed().as_secs_f64();
        log::info!("{} took {:.3}s", self.name, secs);
        secs
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if self.armed {
            log::info!("{} took {:?}", self.name, self.start.elapsed());
        }
    }
}
