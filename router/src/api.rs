//! Embedder-facing surface of the router.

use crate::engine::RoutingEngine;
use crate::schedule::{self, Mode, PhaseOutcome};
use gr_common::db::core::{IspdData, Net};
use gr_common::db::parser::ispd;
use gr_common::util::config::RoutingConfig;
use gr_common::util::rng;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no benchmark loaded; call load or init first")]
    NotLoaded,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceMetrics {
    pub runtime_sec: f64,
    pub total_overflow: i64,
    pub max_overflow: i32,
    pub wirelength_2d: i64,
}

/// Owns a benchmark and drives the schedule over it.
///
/// ```no_run
/// use gr_router::GlobalRouter;
///
/// let mut router = GlobalRouter::default();
/// router.load("adaptec1.gr").unwrap();
/// router.route().unwrap();
/// let m = router.get_performance_metrics();
/// println!("overflow {} wirelength {}", m.total_overflow, m.wirelength_2d);
/// ```
pub struct GlobalRouter {
    config: RoutingConfig,
    data: Option<IspdData>,
    engine: Option<RoutingEngine>,
    mode: Mode,
    adaptive_scoring: bool,
    hum_enabled: bool,
    cancel: Arc<AtomicBool>,
    metrics: PerformanceMetrics,
}

impl Default for GlobalRouter {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

impl GlobalRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            data: None,
            engine: None,
            mode: Mode::Balanced,
            adaptive_scoring: true,
            hum_enabled: true,
            cancel: Arc::new(AtomicBool::new(false)),
            metrics: PerformanceMetrics::default(),
        }
    }

    /// Parses a `.gr` benchmark from disk and takes ownership of it.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let data = ispd::parse_file(path)?;
        self.init(data);
        Ok(())
    }

    /// Takes ownership of an already-parsed benchmark.
    pub fn init(&mut self, data: IspdData) {
        self.data = Some(data);
        self.engine = None;
        self.metrics = PerformanceMetrics::default();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn enable_adaptive_scoring(&mut self, on: bool) {
        self.adaptive_scoring = on;
    }

    pub fn enable_hum(&mut self, on: bool) {
        self.hum_enabled = on;
    }

    /// Shared flag the embedder may set between iterations to stop the
    /// run; the pass in flight finishes first, so state stays
    /// consistent.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Runs the configured phase sequence over the loaded benchmark.
    pub fn route(&mut self) -> Result<PhaseOutcome, RouteError> {
        let data = self.data.as_mut().ok_or(RouteError::NotLoaded)?;
        if let Some(old) = self.engine.take() {
            // re-routing the same benchmark: hand the nets back first
            data.nets = old.into_nets();
        }

        let start = Instant::now();
        rng::reseed(self.config.seed);
        self.cancel.store(false, Ordering::Relaxed);

        let mut engine = RoutingEngine::new(data);
        let use_hum = self.hum_enabled && self.config.enable_hum;
        let (outcome, report) = schedule::run(
            &mut engine,
            &self.config,
            self.mode,
            self.adaptive_scoring,
            use_hum,
            &self.cancel,
        );

        self.metrics = PerformanceMetrics {
            runtime_sec: start.elapsed().as_secs_f64(),
            total_overflow: report.total_overflow,
            max_overflow: report.max_overflow,
            wirelength_2d: report.wirelength,
        };
        self.engine = Some(engine);
        Ok(outcome)
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.metrics
    }

    /// Routed nets with their two-pin paths, for the layer-assignment
    /// pass. Empty before `route`.
    pub fn nets(&self) -> &[Net] {
        self.engine.as_ref().map(|e| e.nets.as_slice()).unwrap_or(&[])
    }

    pub fn engine(&self) -> Option<&RoutingEngine> {
        self.engine.as_ref()
    }

    /// `(width, height)` of the routed grid, once routing has run.
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        self.engine
            .as_ref()
            .map(|e| (e.grid.width(), e.grid.height()))
    }

    /// Drops the benchmark, the grid, and all routing results.
    pub fn cleanup(&mut self) {
        self.data = None;
        self.engine = None;
        self.metrics = PerformanceMetrics::default();
        self.cancel.store(false, Ordering::Relaxed);
    }
}
