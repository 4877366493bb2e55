use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use water_sort_solver::display::render_state;
use water_sort_solver::feasibility;
use water_sort_solver::generator::{self, GeneratorConfig};
use water_sort_solver::model::PuzzleState;
use water_sort_solver::solver::{self, DEFAULT_MAX_DEPTH, SolveStatus, SolverConfig};

/// Retries before giving up on producing a verified-solvable puzzle.
const MAX_GENERATE_ATTEMPTS: u32 = 20;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a puzzle given as text, e.g. "A2,B2;B2,A2;.4"
    Solve {
        /// Tubes separated by ';'; per tube, top-first `<letters><height>`
        /// tokens with '.' for empty space
        puzzle: String,
        /// Longest move sequence to consider
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        /// Wall-clock limit in seconds
        #[arg(long)]
        time_limit: Option<u64>,
        /// Log progress counters while searching
        #[arg(long)]
        progress: bool,
        /// Check that a completed arrangement exists before searching
        #[arg(long)]
        precheck: bool,
        /// Print the parsed board first
        #[arg(long)]
        show: bool,
    },
    /// Generate a random solvable puzzle
    Generate {
        #[arg(long, default_value_t = 4)]
        colors: usize,
        #[arg(long, default_value_t = 2)]
        empty_tubes: usize,
        #[arg(long, default_value_t = 4)]
        capacity: u32,
        /// Reverse pours used to shuffle the solved board
        #[arg(long, default_value_t = 40)]
        pours: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    let debug_enabled = std::env::var("WATER_SORT_DEBUG").is_ok();
    water_sort_solver::log::init_logger(debug_enabled);

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn Error>> {
    match cli.command {
        Command::Solve {
            puzzle,
            max_depth,
            time_limit,
            progress,
            precheck,
            show,
        } => {
            let state = PuzzleState::from_repr(&puzzle)?;
            if show {
                println!("{}", render_state(&state));
            }
            if precheck && !feasibility::arrangement_exists(&state) {
                println!("No arrangement of the liquids completes every tube; unsolvable.");
                return Ok(false);
            }
            let config = SolverConfig {
                max_depth,
                progress,
                time_limit: time_limit.map(Duration::from_secs),
            };
            let result = solver::solve(&state, &config);
            info!(
                "explored {} states ({} unique), max depth {}",
                result.stats.states_explored,
                result.stats.unique_states,
                result.stats.max_depth_reached
            );
            match result.status {
                SolveStatus::Solved => {
                    println!("Solved in {} moves:", result.moves.len());
                    for (i, mv) in result.moves.iter().enumerate() {
                        println!("{:3}. {mv}", i + 1);
                    }
                    Ok(true)
                }
                SolveStatus::Exhausted => {
                    println!("Search space exhausted without a solution; the puzzle is unsolvable.");
                    print_stats(&result);
                    Ok(false)
                }
                SolveStatus::DepthLimited => {
                    println!("No solution within {max_depth} moves; retry with a larger --max-depth.");
                    print_stats(&result);
                    Ok(false)
                }
                SolveStatus::TimedOut { elapsed } => {
                    println!("Timed out after {:.1}s.", elapsed.as_secs_f64());
                    print_stats(&result);
                    Ok(false)
                }
            }
        }
        Command::Generate {
            colors,
            empty_tubes,
            capacity,
            pours,
            seed,
        } => {
            let config = GeneratorConfig {
                colors,
                empty_tubes,
                capacity,
                pours,
            };
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            for attempt in 1..=MAX_GENERATE_ATTEMPTS {
                let state = generator::generate(&config, &mut rng)?;
                let result = solver::solve(&state, &SolverConfig::default());
                if result.is_solved() {
                    println!("{state}");
                    println!();
                    println!("{}", render_state(&state));
                    println!("Reference solution: {} moves.", result.moves.len());
                    return Ok(true);
                }
                info!("attempt {attempt}: generated puzzle not move-solvable, retrying");
            }
            println!("Could not generate a solvable puzzle; try fewer pours or more empty tubes.");
            Ok(false)
        }
    }
}

fn print_stats(result: &solver::SolveResult) {
    println!(
        "Explored {} states ({} unique), max depth {}.",
        result.stats.states_explored, result.stats.unique_states, result.stats.max_depth_reached
    );
}
