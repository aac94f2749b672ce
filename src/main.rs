//! Main entry point for the Market Stall client
//!
//! Interactive command-line client: renders the session state, forwards user
//! intents to the session manager, and drains pending notifications after
//! every command.

use anyhow::Result;
use clap::Parser;
use market_stall::config::AppConfig;
use market_stall::nav::{Navigator, Route};
use market_stall::service::AppState;
use market_stall::types::{ListingPatch, ProfilePatch};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Market Stall - services marketplace client
#[derive(Parser)]
#[command(
    name = "market-stall",
    version,
    about = "Interactive client for a two-sided services marketplace",
    long_about = "Market Stall is a command-line client for a services marketplace: \
                 sign up, authenticate, maintain a profile, and publish a service \
                 listing against the configured backend."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without starting")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    Ok(config)
}

/// Display startup information
fn display_startup_banner(config: &AppConfig) {
    info!("Market Stall client v{}", market_stall::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Blob base URL: {}", config.backend.blob_base_url);
}

fn print_help() {
    println!("commands:");
    println!("  signup <handle> <email> <password>   create an account");
    println!("  login <email> <password>             sign in");
    println!("  logout                               sign out and clear the session");
    println!("  profile [name=..] [handle=..] [bio=..]  update profile fields");
    println!("  publish <description...>             publish or update your listing");
    println!("  avatar <file>                        upload a profile image");
    println!("  image <file>                         upload a listing image");
    println!("  load-profile <id>                    fetch a profile by user id");
    println!("  load-listing <id>                    fetch a listing by owner id");
    println!("  goto <route> | back                  navigate between screens");
    println!("  show | stats | help | quit");
}

fn print_prompt(nav: &Navigator) {
    print!("[{}] > ", nav.current());
    let _ = std::io::stdout().flush();
}

fn render_session(app: &AppState) -> Result<()> {
    let state = app.session().snapshot()?;
    println!(
        "signed in: {}   busy: {}",
        state.signed_in, state.busy
    );
    match &state.profile {
        Some(profile) => println!(
            "profile: {} (handle: {}, name: {}, bio: {}, listings: {})",
            profile.user_id,
            profile.handle.as_deref().unwrap_or("-"),
            profile.name.as_deref().unwrap_or("-"),
            profile.bio.as_deref().unwrap_or("-"),
            profile.listings.len(),
        ),
        None => println!("profile: none"),
    }
    match &state.listing {
        Some(listing) => println!(
            "listing: {} ({}, created {})",
            listing.listing_id,
            listing.description.as_deref().unwrap_or("-"),
            listing.created_at
        ),
        None => println!("listing: none"),
    }
    Ok(())
}

fn parse_profile_patch(args: &[&str]) -> Option<ProfilePatch> {
    let mut patch = ProfilePatch::default();
    for arg in args {
        match arg.split_once('=') {
            Some(("name", value)) => patch.name = Some(value.to_string()),
            Some(("handle", value)) => patch.handle = Some(value.to_string()),
            Some(("bio", value)) => patch.bio = Some(value.to_string()),
            _ => {
                println!("unknown field: {arg} (expected name=, handle= or bio=)");
                return None;
            }
        }
    }
    Some(patch)
}

async fn handle_command(
    app: &AppState,
    nav: &mut Navigator,
    command: &str,
    args: &[&str],
) -> Result<bool> {
    match command {
        "help" => print_help(),
        "quit" | "exit" => return Ok(false),
        "show" => render_session(app)?,
        "stats" => println!("{:#?}", app.session().stats()?),
        "signup" => match args {
            [handle, email, password] => {
                if let Ok(user_id) = app.session().sign_up(handle, email, password).await {
                    println!("signed up as {user_id}");
                    nav.complete_auth();
                }
            }
            _ => println!("usage: signup <handle> <email> <password>"),
        },
        "login" => match args {
            [email, password] => {
                if app.session().log_in(email, password).await.is_ok() {
                    nav.complete_auth();
                }
            }
            _ => println!("usage: login <email> <password>"),
        },
        "logout" => {
            app.session().log_out().await?;
            *nav = Navigator::start(false);
        }
        "profile" => {
            if args.is_empty() {
                println!("usage: profile [name=..] [handle=..] [bio=..]");
            } else if let Some(patch) = parse_profile_patch(args) {
                let _ = app.session().upsert_profile(patch).await;
            }
        }
        "publish" => {
            if args.is_empty() {
                println!("usage: publish <description...>");
            } else {
                let patch = ListingPatch {
                    description: Some(args.join(" ")),
                    ..Default::default()
                };
                if let Ok(listing) = app.session().upsert_listing(patch).await {
                    println!("listing {} published", listing.listing_id);
                }
            }
        }
        "avatar" | "image" => match args {
            [path] => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    if command == "avatar" {
                        let _ = app.session().upload_profile_image(bytes).await;
                    } else {
                        let _ = app.session().upload_listing_image(bytes).await;
                    }
                }
                Err(e) => println!("cannot read {path}: {e}"),
            },
            _ => println!("usage: {command} <file>"),
        },
        "load-profile" => match args {
            [id] => {
                let _ = app.session().load_profile(id).await;
            }
            _ => println!("usage: load-profile <id>"),
        },
        "load-listing" => match args {
            [id] => {
                let _ = app.session().load_listing(id).await;
            }
            _ => println!("usage: load-listing <id>"),
        },
        "goto" => match args {
            [path] => match Route::from_path(path) {
                Some(route) => nav.navigate(route),
                None => println!("unknown route: {path}"),
            },
            _ => println!("usage: goto <route>"),
        },
        "back" => {
            if !nav.back() {
                println!("already at {}", nav.current());
            }
        }
        _ => println!("unknown command: {command} (try 'help')"),
    }

    Ok(true)
}

/// Run the interactive command loop until quit or end of input
async fn run_shell(app: &AppState, nav: &mut Navigator) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();
    print_prompt(nav);

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            print_prompt(nav);
            continue;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let keep_going = handle_command(app, nav, command, &args).await?;

        for notification in app.session().drain_notifications() {
            println!("! {}", notification.message);
        }

        if !keep_going {
            break;
        }
        print_prompt(nav);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        display_startup_banner(&config);
        info!("Configuration validation successful - exiting");
        return Ok(());
    }

    display_startup_banner(&config);

    let app = AppState::new(config);
    if let Err(e) = app.start().await {
        // Restore failures surface as notifications; keep the shell usable.
        info!("Session restore incomplete: {e}");
    }

    for notification in app.session().drain_notifications() {
        println!("! {}", notification.message);
    }

    let signed_in = app.session().snapshot()?.signed_in;
    let mut nav = Navigator::start(signed_in);

    run_shell(&app, &mut nav).await
}
