use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            input: InputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Iterations for the L-shape pass after pre-route.
    #[serde(default = "default_lshape_iterations")]
    pub lshape_iterations: usize,
    #[serde(default = "default_zshape_iterations")]
    pub zshape_iterations: usize,
    #[serde(default = "default_monotonic_iterations")]
    pub monotonic_iterations: usize,
    #[serde(default = "default_hum_iterations")]
    pub hum_iterations: usize,
    /// Iterations for each of the three wirelength-refine passes.
    #[serde(default = "default_refine_iterations")]
    pub refine_iterations: usize,
    /// Consecutive non-improving iterations before a phase gives up.
    #[serde(default = "default_plateau_window")]
    pub plateau_window: usize,
    /// When false, every phase runs with `fixed_stiffness`.
    #[serde(default = "default_adaptive_scoring")]
    pub adaptive_scoring: bool,
    #[serde(default = "default_enable_hum")]
    pub enable_hum: bool,
    /// Stiffness profile (0..=2) used when adaptive scoring is off.
    #[serde(default = "default_fixed_stiffness")]
    pub fixed_stiffness: usize,
    /// Seed for the tie-break RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            lshape_iterations: default_lshape_iterations(),
            zshape_iterations: default_zshape_iterations(),
            monotonic_iterations: default_monotonic_iterations(),
            hum_iterations: default_hum_iterations(),
            refine_iterations: default_refine_iterations(),
            plateau_window: default_plateau_window(),
            adaptive_scoring: default_adaptive_scoring(),
            enable_hum: default_enable_hum(),
            fixed_stiffness: default_fixed_stiffness(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_gr_file")]
    pub gr_file: String,
    #[serde(default = "default_congestion_map")]
    pub congestion_map: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            gr_file: default_gr_file(),
            congestion_map: default_congestion_map(),
        }
    }
}

fn default_lshape_iterations() -> usize {
    1
}

fn default_zshape_iterations() -> usize {
    2
}

fn default_monotonic_iterations() -> usize {
    5
}

fn default_hum_iterations() -> usize {
    10_000
}

fn default_refine_iterations() -> usize {
    4
}

fn default_plateau_window() -> usize {
    100
}

fn default_adaptive_scoring() -> bool {
    true
}

fn default_enable_hum() -> bool {
    true
}

fn default_fixed_stiffness() -> usize {
    0
}

fn default_seed() -> u64 {
    5489
}

fn default_gr_file() -> String {
    "inputs/simple.gr".to_string()
}

fn default_congestion_map() -> String {
    "output/congestion.png".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_schedule() {
        let cfg = RoutingConfig::default();
        assert_eq!(cfg.lshape_iterations, 1);
        assert_eq!(cfg.zshape_iterations, 2);
        assert_eq!(cfg.monotonic_iterations, 5);
        assert_eq!(cfg.hum_iterations, 10_000);
        assert_eq!(cfg.plateau_window, 100);
        assert!(cfg.adaptive_scoring);
        assert!(cfg.enable_hum);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            "[routing]\nhum_iterations = 50\n[input]\ngr_file = \"bench/a.gr\"\n",
        )
        .unwrap();
        assert_eq!(cfg.routing.hum_iterations, 50);
        assert_eq!(cfg.routing.monotonic_iterations, 5);
        assert_eq!(cfg.input.gr_file, "bench/a.gr");
    }
}
