use clap::{Parser, Subcommand};
use daestruct_lap::{Entry, Solution, Solver, SparseMatrix};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "daestruct-lap")]
#[command(about = "Sparse linear assignment solver for structural analysis", long_about = None)]
#[command(after_help = "Example: daestruct-lap solve demos/pendulum.json --check")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the assignment problem for a cost matrix
    Solve {
        /// JSON file with the cost matrix
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
        /// Verify the optimality certificate before printing
        #[arg(short, long)]
        check: bool,
    },
    /// Re-optimize a prior solution against a perturbed cost matrix
    Delta {
        /// JSON file with the perturbed cost matrix
        file: PathBuf,
        /// JSON file with the prior solution (unassigned rows as null)
        prior: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check that a solution is optimal for a cost matrix
    Check {
        /// JSON file with the cost matrix
        file: PathBuf,
        /// JSON file with the solution
        solution: PathBuf,
    },
}

/// On-disk cost matrix: dimension plus the present edges
#[derive(Debug, Deserialize)]
struct MatrixFile {
    dimension: usize,
    entries: Vec<Entry>,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Solve { file, format, check } => {
            let matrix = load_matrix(&file);

            let solution = match Solver::new().solve(&matrix) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };

            if check {
                report_violations(&solution, &matrix);
            }
            print_solution(&solution, &format);
        }
        Commands::Delta { file, prior, format } => {
            let matrix = load_matrix(&file);
            let prior: Solution = load_json(&prior);

            let solution = match Solver::new().resolve(&matrix, &prior) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Delta error: {}", e);
                    std::process::exit(1);
                }
            };

            print_solution(&solution, &format);
        }
        Commands::Check { file, solution } => {
            let matrix = load_matrix(&file);
            let solution: Solution = load_json(&solution);

            report_violations(&solution, &matrix);
            println!("✓ {} is optimal (cost {})", file.display(), solution.cost);
        }
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&source) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Parse error in {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_matrix(path: &Path) -> SparseMatrix {
    let file: MatrixFile = load_json(path);
    match SparseMatrix::from_entries(file.dimension, file.entries) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Invalid matrix in {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn report_violations(solution: &Solution, matrix: &SparseMatrix) {
    let violations = solution.violations(matrix);
    if violations.is_empty() {
        return;
    }

    eprintln!("✗ solution is not optimal:");
    for v in &violations {
        eprintln!("  - {}", v);
    }
    std::process::exit(1);
}

fn print_solution(solution: &Solution, format: &str) {
    if format == "json" {
        match serde_json::to_string_pretty(solution) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing solution: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Status: OPTIMAL");
    println!("Total cost: {}", solution.cost);
    println!();
    println!("Assignment:");
    for (row, col) in solution.assignment() {
        println!("  row {:6} -> column {:6}  (u = {}, v = {})", row, col, solution.u[row], solution.v[col]);
    }
    log::debug!("{}", solution);
}
