//! Floating Sandbox NPC Headless Harness
//!
//! Runs human behavior scenarios on the engine and checks the convergence
//! and decay figures the behaviors are tuned around.
//! Runs entirely in-process: no rendering, no game loop.
//!
//! Usage:
//!   cargo run -p floatsand-simtest
//!   cargo run -p floatsand-simtest -- --verbose

use std::cell::RefCell;
use std::rc::Rc;

use floatsand_core::prelude::*;
use floatsand_logic::behavior::HumanNpcState;
use floatsand_logic::constants::{rates, BOMB_PANIC_DECAY, ON_FIRE_PANIC_DECAY};
use floatsand_logic::convergence::{converge, is_at_target};
use floatsand_logic::events::NpcEventSink;
use serde::Deserialize;

// ── Scenarios ───────────────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct HullSpec {
    columns: u32,
    decks: u32,
    cell_width: f32,
    deck_height: f32,
}

#[derive(Debug, Deserialize)]
struct HumanSpec {
    x: f32,
    y: f32,
    height: f32,
    seed: f32,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    hull: HullSpec,
    sea_level: f32,
    #[serde(default)]
    generalized_panic: f32,
    humans: Vec<HumanSpec>,
    steps: u32,
    /// Leading behavior changes of the first human
    expected_behaviors: Vec<String>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

/// Behavior changes of the selected NPC, readable after handing the sink over.
#[derive(Clone, Default)]
struct SharedTrace(Rc<RefCell<Vec<BehaviorType>>>);

impl NpcEventSink for SharedTrace {
    fn on_human_behavior_changed(&mut self, _npc_id: NpcId, new_behavior: BehaviorType) {
        self.0.borrow_mut().push(new_behavior);
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Floating Sandbox NPC Harness ===\n");

    let mut results = Vec::new();

    // 1. Convergence timings
    results.extend(validate_convergence(verbose));

    // 2. Panic decay
    results.extend(validate_panic_decay(verbose));

    // 3. Engine scenarios
    results.extend(validate_scenarios(verbose));

    // 4. Save / load
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Convergence ──────────────────────────────────────────────────────

/// Frames for `converge` to get within tolerance of 1 from 0.
fn frames_to_converge(rate: f32, target_tolerance: f32) -> u32 {
    let mut value = 0.0;
    let mut frames = 0;
    while !is_at_target(value, 1.0) && 1.0 - value > target_tolerance {
        value = converge(value, 1.0, rate);
        frames += 1;
    }
    frames
}

fn validate_convergence(verbose: bool) -> Vec<TestResult> {
    println!("--- Convergence ---");
    let mut results = Vec::new();

    let cases = [
        ("aerial_to_rising", rates::AERIAL_TO_RISING, 0.0, 7),
        ("falling_to_aerial", rates::FALLING_TO_AERIAL, 0.0, 11),
        ("equilibrium_to_walking", rates::EQUILIBRIUM_TO_WALKING, 0.0, 37),
        ("walk_flip_decision", rates::WALK_FLIP, 0.05, 29),
    ];

    for (name, rate, tolerance, expected) in cases {
        let frames = frames_to_converge(rate, tolerance);
        if verbose {
            println!("  {}: rate {:.2} -> {} frames", name, rate, frames);
        }
        results.push(TestResult {
            name: format!("converge_{}", name),
            passed: frames == expected,
            detail: format!("{} frames (expected {})", frames, expected),
        });
    }

    results
}

// ── 2. Panic Decay ──────────────────────────────────────────────────────

/// Frames for a panic level of 1 to decay below 0.01.
fn frames_to_calm(decay: f32) -> u32 {
    let mut level: f32 = 1.0;
    let mut frames = 0;
    while level >= 0.01 {
        level -= level * decay;
        frames += 1;
    }
    frames
}

fn validate_panic_decay(verbose: bool) -> Vec<TestResult> {
    println!("--- Panic Decay ---");
    let mut results = Vec::new();

    let on_fire = frames_to_calm(ON_FIRE_PANIC_DECAY);
    let bomb = frames_to_calm(BOMB_PANIC_DECAY);
    if verbose {
        println!("  on fire: {} frames, bomb: {} frames", on_fire, bomb);
    }

    results.push(TestResult {
        name: "panic_on_fire_decay".into(),
        passed: (458..=460).contains(&on_fire),
        detail: format!("{} frames to calm down", on_fire),
    });
    results.push(TestResult {
        name: "panic_bomb_decay".into(),
        passed: (1838..=1842).contains(&bomb),
        detail: format!("{} frames to calm down", bomb),
    });

    // Fresh humans start calm and upright-facing
    let state = HumanNpcState::new(1.65, 0.0);
    results.push(TestResult {
        name: "new_human_calm".into(),
        passed: state.resultant_panic_level == 0.0 && state.current_face_orientation == 1.0,
        detail: format!(
            "panic {:.2}, orientation {:.0}",
            state.resultant_panic_level, state.current_face_orientation
        ),
    });

    results
}

// ── 3. Scenarios ────────────────────────────────────────────────────────

fn build_engine(scenario: &Scenario) -> (NpcSimulationEngine, Vec<NpcId>) {
    let hull = &scenario.hull;
    let ship = ShipMesh::box_hull(Vec2::ZERO, hull.cell_width, hull.deck_height, hull.columns, hull.decks);
    let mut engine = NpcSimulationEngine::new(ship, Ocean::new(scenario.sea_level));
    engine.seed_rng(7);
    engine.set_generalized_panic_level(scenario.generalized_panic);

    let ids = scenario
        .humans
        .iter()
        .map(|h| engine.add_human(Vec2::new(h.x, h.y), h.height, h.seed))
        .collect();
    (engine, ids)
}

fn run_scenario(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    let mut results = Vec::new();
    let (mut engine, ids) = build_engine(scenario);

    let trace = SharedTrace::default();
    engine.set_event_sink(Box::new(trace.clone()));
    engine.select_npc(ids.first().copied());

    for id in &ids {
        if let Err(e) = engine.end_placement(*id) {
            results.push(TestResult {
                name: format!("{}_placement", scenario.name),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    }

    let mut all_finite = true;
    for _ in 0..scenario.steps {
        engine.step();
        all_finite &= ids.iter().all(|id| {
            [ParticleOrdinal::Feet, ParticleOrdinal::Head].iter().all(|o| {
                engine
                    .particle_position(*id, *o)
                    .is_some_and(|p| p.x.is_finite() && p.y.is_finite())
            })
        });
    }

    let observed: Vec<&str> = trace.0.borrow().iter().map(|b| b.name()).collect();
    if verbose {
        println!("  {}: {}", scenario.name, observed.join(" -> "));
    }

    let expected: Vec<&str> = scenario.expected_behaviors.iter().map(String::as_str).collect();
    let matches = observed.len() >= expected.len() && observed[..expected.len()] == expected[..];
    results.push(TestResult {
        name: format!("{}_behaviors", scenario.name),
        passed: matches,
        detail: format!("observed {}", observed.join(" -> ")),
    });

    results.push(TestResult {
        name: format!("{}_finite", scenario.name),
        passed: all_finite,
        detail: format!("{} humans over {} steps", ids.len(), scenario.steps),
    });

    results
}

fn validate_scenarios(verbose: bool) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "scenarios_not_empty".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios loaded", scenarios.len()),
    });

    for scenario in &scenarios {
        results.extend(run_scenario(scenario, verbose));
    }

    results
}

// ── 4. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let ship = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 3, 1);
    let mut engine = NpcSimulationEngine::new(ship, Ocean::new(-10.0));
    for x in [1.0, 3.0, 5.0] {
        let id = engine.add_human(Vec2::new(x, 0.0), 1.65, x / 6.0);
        let _ = engine.end_placement(id);
    }
    for _ in 0..64 {
        engine.step();
    }

    let mut buffer = Vec::new();
    if let Err(e) = engine.save(&mut buffer) {
        results.push(TestResult {
            name: "save".into(),
            passed: false,
            detail: e.to_string(),
        });
        return results;
    }
    if verbose {
        println!("  save size: {} bytes", buffer.len());
    }

    let mut loaded = NpcSimulationEngine::new(ShipMesh::new(), Ocean::new(0.0));
    let load = loaded.load(&buffer[..]);
    results.push(TestResult {
        name: "load".into(),
        passed: load.is_ok(),
        detail: match &load {
            Ok(()) => format!("{} bytes", buffer.len()),
            Err(e) => e.to_string(),
        },
    });

    let same_behaviors = engine
        .npc_ids()
        .iter()
        .all(|id| engine.behavior_of(*id) == loaded.behavior_of(*id));
    results.push(TestResult {
        name: "load_preserves_behaviors".into(),
        passed: same_behaviors && loaded.npc_count() == engine.npc_count(),
        detail: format!("{} NPCs", loaded.npc_count()),
    });

    results
}
