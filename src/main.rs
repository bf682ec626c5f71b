use clap::{Parser, Subcommand};
// Only import Daemonize on Unix platforms
#[cfg(unix)]
use daemonize::Daemonize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use sysinfo::{Pid, System};

use deku_media::config::{load_config, project_dirs};
use deku_media::extractor::YtDlp;
use deku_media::{router, AppState};

// --- Command-Line Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Paste a video link, pick a format, get the file.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manages the server process.
    Server {
        #[command(subcommand)]
        action: ServerAction,
    },
}

#[derive(Subcommand, Debug)]
enum ServerAction {
    /// Start the server as a background process.
    Start,
    /// Stop the background server process.
    Stop,
    /// Restart the background server process.
    Restart,
    /// Run the server in the foreground.
    Run,
    /// Check the status of the background server process.
    Status,
}

// --- Main Application Logic ---
// No runtime exists until a command needs one: `start` forks first.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Server { action } => match action {
            ServerAction::Start => start_server()?,
            ServerAction::Stop => stop_server()?,
            ServerAction::Restart => {
                stop_server()?;
                std::thread::sleep(std::time::Duration::from_secs(1));
                start_server()?;
            }
            ServerAction::Run => serve_blocking()?,
            ServerAction::Status => check_status()?,
        },
    }

    Ok(())
}

// --- Server Action Functions ---

/// Runs the server to completion on a fresh tokio runtime.
fn serve_blocking() -> anyhow::Result<()> {
    tokio::runtime::Runtime::new()?.block_on(run_server())
}

/// The core function that runs the Axum web server.
async fn run_server() -> anyhow::Result<()> {
    let config = load_config().await?;
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level()?)
        .init();

    tokio::fs::create_dir_all(&config.downloads_root).await?;
    tracing::info!("Downloads go under {}", config.downloads_root.display());

    let extractor = Arc::new(YtDlp::new(&config.ytdlp_program));
    let state = AppState::new(extractor, config.downloads_root.clone());

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("{}:{}", host, port_str);
    let app = router(state);

    tracing::info!("Starting server in foreground, listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Starts the server as a background process using platform-specific logic.
fn start_server() -> anyhow::Result<()> {
    if is_running()? {
        println!("Server is already running.");
        return Ok(());
    }

    let pid_file = get_pid_path()?;
    println!("Starting server in the background...");
    println!("PID file at: {}", pid_file.display());

    #[cfg(unix)]
    {
        // The PID file holds the daemon's own PID, so it must serve itself.
        let daemonize = Daemonize::new()
            .pid_file(&pid_file)
            .working_directory(env::current_dir()?);
        match daemonize.start() {
            Ok(_) => serve_blocking()?,
            Err(e) => eprintln!("Error, failed to daemonize: {}", e),
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        use std::process::Command;
        const CREATE_NO_WINDOW: u32 = 0x08000000;

        let myself = env::current_exe()?;
        let child = Command::new(&myself)
            .arg("server")
            .arg("run")
            .creation_flags(CREATE_NO_WINDOW)
            .spawn()?;

        fs::write(&pid_file, child.id().to_string())?;
        println!("Server started successfully.");
    }

    Ok(())
}

/// Stops the background server process.
fn stop_server() -> anyhow::Result<()> {
    let pid_file = get_pid_path()?;
    if !pid_file.exists() {
        println!("Server is not running (no PID file).");
        return Ok(());
    }
    let pid = read_pid()?;
    let s = System::new_all();
    if let Some(process) = s.process(Pid::from_u32(pid)) {
        println!("Stopping server process with PID: {}", pid);
        process.kill();
    } else {
        println!("Process with PID {} not found. It may have already stopped.", pid);
    }
    fs::remove_file(&pid_file)?;
    println!("Server stopped.");
    Ok(())
}

/// Checks if the server process is running.
fn check_status() -> anyhow::Result<()> {
    if is_running()? {
        println!("Server is running with PID: {}", read_pid()?);
    } else {
        println!("Server is not running.");
    }
    Ok(())
}

// --- Helper Functions ---

/// Gets the path for the server's PID file.
fn get_pid_path() -> anyhow::Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let data_dir = project_dirs.data_local_dir();
    fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("server.pid"))
}

fn read_pid() -> anyhow::Result<u32> {
    let pid_str = fs::read_to_string(get_pid_path()?)?;
    Ok(pid_str.trim().parse()?)
}

/// Checks if the server is running by checking the PID file and the process list.
fn is_running() -> anyhow::Result<bool> {
    if !get_pid_path()?.exists() {
        return Ok(false);
    }
    let pid = read_pid()?;
    let s = System::new_all();
    Ok(s.process(Pid::from_u32(pid)).is_some())
}
