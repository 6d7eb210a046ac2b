//! fricas-session - line-oriented front end
//!
//! Forwards stdin lines to a FriCAS session and prints its output. Lines
//! starting with `:` are front-end commands (`:help` lists them).

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use fricas_session::{
    handle_startup_error, load_config, vocabulary, InfoViews, Session, SessionEvent,
    SessionRegistry,
};

/// Command line options
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug logging
    debug: bool,
    /// Session name
    name: Option<String>,
}

impl AppArgs {
    fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        let mut app_args = AppArgs::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    let path = args.get(i + 1).context("Missing config file path")?;
                    app_args.config_path = Some(PathBuf::from(path));
                    i += 1;
                }
                "--name" | "-n" => {
                    let name = args.get(i + 1).context("Missing session name")?;
                    app_args.name = Some(name.clone());
                    i += 1;
                }
                "--debug" | "-d" => app_args.debug = true,
                "--help" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("{} v{}", fricas_session::NAME, fricas_session::VERSION);
                    process::exit(0);
                }
                arg if arg.starts_with('-') => anyhow::bail!("Unknown option: {}", arg),
                arg => warn!("Ignoring positional argument: {}", arg),
            }
            i += 1;
        }

        Ok(app_args)
    }
}

fn print_help() {
    println!("{} - {}", fricas_session::NAME, fricas_session::DESCRIPTION);
    println!();
    println!("USAGE:");
    println!("    fricas-session [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Path to configuration file");
    println!("    -n, --name <NAME>      Session name (default: fricas)");
    println!("    -d, --debug            Enable debug logging");
    println!("    -h, --help             Print this help message");
    println!("    -v, --version          Print version information");
    println!();
    print_commands();
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

fn print_commands() {
    println!("COMMANDS:");
    println!("    :show NAME             Show a constructor (full name or abbreviation)");
    println!("    :op NAME               Show an operation");
    println!("    :refresh NAME          Query NAME again instead of using the cached view");
    println!("    :complete PREFIX       Complete a constructor or operation name");
    println!("    :pwd                   Ask FriCAS for its directory");
    println!("    :read FILE             )read a file");
    println!("    :compile FILE          )compile a file");
    println!("    :interrupt             Interrupt the running computation");
    println!("    :quit                  Stop FriCAS and exit");
}

#[tokio::main]
async fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("{}", e);
        print_help();
        process::exit(2);
    });

    let log_level = if args.debug { "debug" } else { "warn" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: AppArgs) -> Result<()> {
    let config = load_config(args.config_path.as_deref()).map_err(|e| {
        eprintln!("{}", handle_startup_error(&e));
        e
    })?;
    let name = args.name.unwrap_or_else(|| "fricas".to_string());

    info!("Starting {} v{}", fricas_session::NAME, fricas_session::VERSION);
    let registry = SessionRegistry::new();
    let session = registry
        .start(&name, config.clone())
        .await
        .map_err(|e| {
            eprintln!("{}", handle_startup_error(&e));
            e
        })?;
    let mut views = InfoViews::new(config.views.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(30));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !handle_line(&session, &mut views, &line).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {}
        }

        if !print_events(session.poll().await) {
            break;
        }
    }

    if let Err(e) = registry.terminate(&name).await {
        debug!("Shutdown: {}", e);
    }
    Ok(())
}

/// Returns false when the front end should exit
async fn handle_line(session: &Arc<Session>, views: &mut InfoViews, line: &str) -> bool {
    let (command, argument) = match line.strip_prefix(':') {
        Some(rest) => match rest.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (rest.trim(), ""),
        },
        None => {
            report(session.submit(line).await);
            return true;
        }
    };

    match command {
        "quit" | "q" => return false,
        "help" => print_commands(),
        "show" => match views.show_constructor(session, argument, false).await {
            Ok(view) => print_view(view.name(), view.text()),
            Err(e) => eprintln!("{}", e),
        },
        "op" => match views.show_operation(session, argument, false).await {
            Ok(view) => print_view(view.name(), view.text()),
            Err(e) => eprintln!("{}", e),
        },
        "refresh" => match views.refresh(session, argument).await {
            Ok(view) => print_view(view.name(), view.text()),
            Err(e) => eprintln!("{}", e),
        },
        "complete" => println!("{}", vocabulary::complete(argument).join(" ")),
        "pwd" => match session.force_directory_update(false).await {
            Ok(Some(_)) => {}
            Ok(None) => eprintln!("FriCAS did not report its directory"),
            Err(e) => eprintln!("{}", e),
        },
        "read" => report(session.read_file(Path::new(argument)).await),
        "compile" => match session.compile_file(Path::new(argument)).await {
            Ok(dir) => eprintln!("Compiling into {}", dir.display()),
            Err(e) => eprintln!("{}", e),
        },
        "interrupt" => report(session.interrupt().await),
        other => eprintln!("Unknown command ':{}', try :help", other),
    }
    true
}

fn report(result: fricas_session::Result<()>) {
    if let Err(e) = result {
        eprintln!("{}", e);
    }
}

fn print_view(name: &str, text: &str) {
    println!("--- {} ---", name);
    print!("{}", text);
    println!("---");
}

/// Returns false once the process has exited
fn print_events(events: Vec<SessionEvent>) -> bool {
    let mut stdout = std::io::stdout();
    for event in events {
        match event {
            SessionEvent::Output(text) => {
                print!("{}", text);
            }
            SessionEvent::Notice(message) => eprintln!("{}", message),
            SessionEvent::DirectoryChanged(path) => debug!("Directory: {}", path.display()),
            SessionEvent::CompilationFinished(outcome) => debug!("Compilation: {:?}", outcome),
            SessionEvent::Prompt(_) => {}
            SessionEvent::Exited => {
                eprintln!("FriCAS exited");
                return false;
            }
        }
    }
    let _ = stdout.flush();
    true
}
