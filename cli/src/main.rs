//! Scripted demo runner for the supply game engine.
//!
//! Plays every chain with a naive pass-through policy (each role orders
//! whatever demand it saw last week) and prints weekly cost summaries. Same
//! seed, same config: identical run every time.

use clap::{Parser, ValueEnum};
use supply_game_core_rs::{
    Action, DemandConfig, DemandPattern, GameConfig, GameEngine, Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pattern {
    Sine,
    Step,
    Random,
    Constant,
}

#[derive(Debug, Parser)]
#[command(name = "supply-game", about = "Run a scripted supply chain game")]
struct Args {
    /// Weeks to play
    #[arg(long, default_value_t = 12)]
    weeks: usize,

    /// Number of competing chains
    #[arg(long, default_value_t = 1)]
    chains: usize,

    /// Seed for the demand stream
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Customer demand pattern
    #[arg(long, value_enum, default_value = "sine")]
    pattern: Pattern,

    /// Lockstep mode: no chain starts a week until all chains reach it
    #[arg(long, default_value_t = false)]
    lockstep: bool,
}

/// Steady-state order placed before any demand has been observed.
const OPENING_ORDER: i64 = 4;

fn main() {
    env_logger::init();
    let args = Args::parse();

    let pattern = match args.pattern {
        Pattern::Sine => DemandPattern::SineWave {
            base: 5,
            amplitude: 10,
        },
        Pattern::Step => DemandPattern::Step {
            low: 5,
            high: 10,
            period: 10,
        },
        Pattern::Random => DemandPattern::Random { min: 2, max: 8 },
        Pattern::Constant => DemandPattern::Constant { level: 5 },
    };

    let config = GameConfig {
        num_chains: args.chains,
        weeks_total: args.weeks,
        lockstep: args.lockstep,
        demand: DemandConfig {
            pattern,
            rng_seed: args.seed,
        },
        ..GameConfig::default()
    };

    let engine = match GameEngine::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };
    engine.start();
    println!(
        "game {} | {} chain(s) | {} week(s) | pattern {:?}",
        engine.game_id(),
        args.chains,
        args.weeks,
        args.pattern
    );

    let chain_ids: Vec<String> = engine.chain_ids().to_vec();
    for week in 0..args.weeks {
        for chain_id in &chain_ids {
            for &role in &Role::CHAIN_ORDER {
                let quantity = order_for(&engine, chain_id, role);
                let key = format!("cli:{}:{}:{}", chain_id, week, role);
                if let Err(err) = engine.submit_action(Action::place_order(
                    chain_id, week, role, quantity, key,
                )) {
                    eprintln!("{} week {} {}: {}", chain_id, week, role, err);
                }
            }
        }

        for advanced in engine.drain_notifications() {
            let score = engine.get_score(&advanced.chain_id, advanced.week);
            let week_cost: i64 = score
                .iter()
                .filter(|r| r.week == advanced.week)
                .map(|r| r.holding_cost + r.backorder_cost)
                .sum();
            let cumulative = score
                .last()
                .map(|r| r.cumulative_chain_cost)
                .unwrap_or(0);
            println!(
                "week {:>3} | {} | cost {:>8} | total {:>9}",
                advanced.week,
                advanced.chain_id,
                cents(week_cost),
                cents(cumulative),
            );
        }
    }

    println!("\nfinal standings");
    let view = engine.get_host_view();
    for chain in &view.chains {
        println!("{} | total {}", chain.snapshot.chain_id, cents(chain.total_cost));
        for &role in &Role::CHAIN_ORDER {
            let last = chain
                .scores
                .iter()
                .rev()
                .find(|r| r.role == role);
            if let Some(record) = last {
                let bullwhip = record
                    .bullwhip_ratio
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "  {:<10} cost {:>9} | bullwhip {}",
                    role.to_string(),
                    cents(record.cumulative_role_cost),
                    bullwhip,
                );
            }
        }
    }
}

/// Naive pass-through policy: order what you saw demanded last week.
fn order_for(engine: &GameEngine, chain_id: &str, role: Role) -> i64 {
    engine
        .get_chain_state(chain_id)
        .and_then(|snapshot| snapshot.role(role).demand_received.last().copied())
        .unwrap_or(OPENING_ORDER)
}

fn cents(amount: i64) -> String {
    format!("${}.{:02}", amount / 100, (amount % 100).abs())
}
