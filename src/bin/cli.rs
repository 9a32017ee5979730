#![cfg(not(tarpaulin_include))]

//! campus-cli: maintenance commands for a Campus Hub data directory

use campus_hub::config::DEFAULT_DATA_DIR;
use campus_hub::{downloader, saving, seed, stats};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Maintenance commands for a Campus Hub data directory", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the JSON documents
    #[arg(long, env = "CAMPUS_HUB_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the demo users, resources and reviews
    Seed {
        /// Replace documents that already exist
        #[arg(short, long)]
        force: bool,
    },

    /// Print platform totals
    Stats,

    /// Print the leaderboard
    Leaderboard {
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Write a compressed snapshot of the whole state
    Export {
        /// Output file (e.g. campus-hub.bin.gz)
        file: PathBuf,
    },

    /// Replace the state with a snapshot
    Import {
        /// Snapshot file written by `export`
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let dir = cli.data_dir.as_path();

    match cli.command {
        Commands::Seed { force } => {
            if !force && dir.join("users.json").exists() {
                eprintln!(
                    "{} already holds data, use --force to overwrite it",
                    dir.display()
                );
                return Ok(());
            }
            let state = seed::demo_state()?;
            saving::save_state(dir, &state)?;
            println!(
                "Seeded {} users, {} resources and {} reviews into {}",
                state.users.len(),
                state.resources.len(),
                state.reviews.len(),
                dir.display()
            );
        }
        Commands::Stats => {
            let state = saving::load_state(dir)?;
            let totals = stats::admin_stats(&state.users, &state.resources, &state.reviews);
            println!("Users:     {}", totals.total_users);
            println!("Resources: {}", totals.total_resources);
            println!("Reviews:   {}", totals.total_reviews);
        }
        Commands::Leaderboard { csv } => {
            let state = saving::load_state(dir)?;
            let board = stats::leaderboard(&state.users, &state.resources, &state.reviews);
            if csv {
                print!("{}", downloader::leaderboard_to_csv(&board));
            } else {
                println!("{:<5} {:<24} {:<20} {:>7} {:>7}", "Rank", "Name", "College", "Uploads", "Points");
                for (idx, entry) in board.iter().enumerate() {
                    println!(
                        "{:<5} {:<24} {:<20} {:>7} {:>7}",
                        idx + 1,
                        entry.user.name,
                        entry.user.college,
                        entry.upload_count,
                        entry.points
                    );
                }
            }
        }
        Commands::Export { file } => {
            let state = saving::load_state(dir)?;
            saving::save_snapshot(&state, &file)?;
            println!("Wrote snapshot to {}", file.display());
        }
        Commands::Import { file } => {
            let mut state = saving::load_snapshot(&file)?;
            saving::normalize_state(&mut state)?;
            saving::save_state(dir, &state)?;
            println!(
                "Imported {} users and {} resources into {}",
                state.users.len(),
                state.resources.len(),
                dir.display()
            );
        }
    }

    Ok(())
}
