//! End-to-end routing scenarios through the public API.

use gr_common::db::core::IspdData;
use gr_common::db::parser::ispd;
use gr_common::util::generator;
use gr_router::{GlobalRouter, Mode, PhaseOutcome, check};

fn tiny_benchmark() -> IspdData {
    ispd::parse(
        "\
grid 2 2 1
vertical capacity 10
horizontal capacity 20
minimum width 1
minimum spacing 1
via spacing 1
0 0 10 10
num net 1
net0 0 2 1
0 0 1
10 10 1
0
",
    )
    .unwrap()
}

#[test]
fn routes_a_two_by_two_benchmark() {
    let mut router = GlobalRouter::default();
    router.init(tiny_benchmark());
    let outcome = router.route().unwrap();
    assert_eq!(outcome, PhaseOutcome::Converged);

    let m = router.get_performance_metrics();
    assert_eq!(m.total_overflow, 0);
    assert_eq!(m.wirelength_2d, 2);
    assert!(m.runtime_sec >= 0.0);

    let nets = router.nets();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0].two_pins.len(), 1);
    assert_eq!(nets[0].two_pins[0].path.len(), 2);

    check::run(router.engine().unwrap()).unwrap();
}

#[test]
fn grid_matches_the_three_by_two_scenario() {
    let data = ispd::parse(
        "\
grid 3 2 1
vertical capacity 10
horizontal capacity 20
minimum width 1
minimum spacing 1
via spacing 1
0 0 10 10
num net 1
net0 0 2 1
0 0 1
20 10 1
0
",
    )
    .unwrap();

    let mut router = GlobalRouter::default();
    router.init(data);
    router.route().unwrap();

    let engine = router.engine().unwrap();
    // min_net = 2, so the per-layer sums are halved
    assert_eq!(engine.grid.at(0, 0, false).cap, 5);
    assert_eq!(engine.grid.at(0, 0, true).cap, 10);
    assert_eq!(router.nets()[0].two_pins[0].path.len(), 3);
}

#[test]
fn trivial_nets_do_not_reach_the_output() {
    let data = ispd::parse(
        "\
grid 4 4 1
vertical capacity 10
horizontal capacity 10
minimum width 1
minimum spacing 1
via spacing 1
0 0 10 10
num net 2
fat 0 2 1
0 0 1
30 30 1
skinny 1 2 1
5 5 1
6 6 1
0
",
    )
    .unwrap();

    let mut router = GlobalRouter::default();
    router.init(data);
    router.route().unwrap();
    let nets = router.nets();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0].name, "fat");
}

#[test]
fn rerouting_the_same_benchmark_is_stable() {
    let mut router = GlobalRouter::default();
    router.init(tiny_benchmark());
    router.route().unwrap();
    let wl1 = router.get_performance_metrics().wirelength_2d;
    router.route().unwrap();
    let wl2 = router.get_performance_metrics().wirelength_2d;
    assert_eq!(wl1, wl2);
    check::run(router.engine().unwrap()).unwrap();
}

#[test]
fn cancel_flag_is_rearmed_per_route_call() {
    // A stale flag from an earlier run must not poison the next one.
    let mut router = GlobalRouter::default();
    router.init(tiny_benchmark());
    router
        .cancel_flag()
        .store(true, std::sync::atomic::Ordering::Relaxed);
    let outcome = router.route().unwrap();
    assert_ne!(outcome, PhaseOutcome::Cancelled);
    assert!(!router.cancel_flag().load(std::sync::atomic::Ordering::Relaxed));
}

#[test]
fn generated_benchmark_routes_without_leftover_locks() {
    let dir = std::env::temp_dir().join(format!("gr-smoke-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("random.gr");

    gr_common::util::rng::reseed(99);
    generator::generate_random_gr(path.to_str().unwrap(), 16, 16, 60, 3, 20).unwrap();

    let mut cfg = gr_common::util::config::RoutingConfig::default();
    cfg.hum_iterations = 200;
    cfg.plateau_window = 25;

    let mut router = GlobalRouter::new(cfg);
    router.set_mode(Mode::Balanced);
    router.load(&path).unwrap();
    router.route().unwrap();

    let engine = router.engine().unwrap();
    for e in engine.grid.edges() {
        assert_eq!(e.used, 0);
    }
    check::run(engine).unwrap();

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn disabling_hum_still_routes() {
    let mut router = GlobalRouter::default();
    router.init(tiny_benchmark());
    router.enable_hum(false);
    router.enable_adaptive_scoring(false);
    let outcome = router.route().unwrap();
    assert_eq!(outcome, PhaseOutcome::Converged);
}
