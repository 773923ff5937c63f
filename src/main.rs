use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use misarcade::leaderboard::LeaderboardState;
use misarcade::storage::{self, add_guest_score, guest_best_scores, sign_in, sign_in_guest};
use misarcade::{AppError, AppState, ArcadeConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the top scores of a game
    Leaderboard {
        game: String,
        /// Load once more after the first load completes
        #[arg(long)]
        refresh: bool,
    },
    /// Record a local (guest) score
    Submit { game: String, score: f64 },
    /// Best local score per game
    Best,
    /// Store a signed-in identity
    Login {
        user_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Continue as a guest
    Guest {
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and purge local state
    Logout,
    /// Send session heartbeats until interrupted
    Track {
        #[arg(long, default_value = "/")]
        page: String,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// List the session records of the current user
    Sessions,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "misarcade=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), AppError> {
    let state = AppState::from_config(ArcadeConfig::load())?;
    let local = state.local_store.as_ref();

    match command {
        Command::Leaderboard { game, refresh } => {
            let loader = state.leaderboard();
            loader
                .set_game_key(game)
                .await
                .map_err(|_| AppError::Internal)?;
            if refresh {
                loader.refresh().await;
            }
            print_leaderboard(&loader.snapshot());
            loader.dispose();
        }
        Command::Submit { game, score } => {
            if add_guest_score(local, &game, score) {
                println!("Recorded {score} for {game}");
            } else {
                println!("Score {score} for {game} was already recorded");
            }
        }
        Command::Best => {
            let best = guest_best_scores(local);
            if best.is_empty() {
                println!("No local scores yet");
            }
            for (game, score) in best {
                println!("{game:<24} {score}");
            }
        }
        Command::Login {
            user_id,
            name,
            avatar_url,
        } => {
            sign_in(local, &user_id, name.as_deref(), avatar_url.as_deref())?;
            println!("Signed in as {user_id}");
        }
        Command::Guest { name } => {
            let guest_id = sign_in_guest(local, name.as_deref())?;
            println!("Playing as {guest_id}");
        }
        Command::Logout => {
            storage::clear_all_local_storage(local, Some(state.session_store.as_ref()));
            println!("Signed out");
        }
        Command::Track { page, seconds } => {
            state.page.set(page);
            let tracker = state.session_tracker();
            tracker.attach(&state.event_bus);

            if !tracker.is_tracking() {
                tracker.detach();
                println!("Not tracking: sign in and configure POCKETBASE_URL first");
                return Ok(());
            }

            info!("Tracking session, press Ctrl-C to stop");
            match seconds {
                Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                None => {
                    tokio::signal::ctrl_c()
                        .await
                        .map_err(|e| AppError::Config(e.to_string()))?;
                }
            }
            tracker.detach();
        }
        Command::Sessions => {
            let sessions = state.session_tracker().own_sessions().await;
            if sessions.is_empty() {
                println!("No sessions found");
            }
            for session in sessions {
                println!("{:<20} {}", session.user, session.last_action);
            }
        }
    }

    Ok(())
}

fn print_leaderboard(state: &LeaderboardState) {
    if state.is_guest_mode {
        println!("(local scores, guest mode)");
    }
    if let Some(error) = &state.error {
        println!("{error}");
    }
    if state.is_empty() {
        println!("No scores yet");
    }
    for entry in &state.entries {
        println!(
            "{:>3}. {:<24} {}",
            entry.rank, entry.user.display_name, entry.score
        );
    }
}
