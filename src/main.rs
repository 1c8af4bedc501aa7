use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use stepper::config::Config;
use stepper::demo::{self, Reply, Session};
use stepper::logging;
use stepper::nav::SHORTCUTS;

#[derive(Parser)]
#[command(name = "stepper")]
#[command(about = "Step-by-step registration wizard in the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the registration wizard (default)
    Run {
        /// Only allow completed steps and the next one
        #[arg(short, long)]
        linear: bool,

        /// Keep the active step outside the engine
        #[arg(long)]
        controlled: bool,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to .stepper/config.toml
        #[arg(long)]
        save: bool,
    },

    /// List tab strip keyboard shortcuts
    Shortcuts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    // The wizard owns stdout, so its logs go to a file
    let interactive = matches!(cli.command, None | Some(Commands::Run { .. }));
    let logging_handle = logging::init_logging(&config, interactive, cli.debug)?;

    match cli.command {
        Some(Commands::Run { linear, controlled }) => {
            run_wizard(&config, linear, controlled).await?;
        }
        Some(Commands::Config { save }) => {
            cmd_config(&config, save)?;
        }
        Some(Commands::Shortcuts) => {
            cmd_shortcuts();
        }
        None => {
            run_wizard(&config, false, false).await?;
        }
    }

    report_log_file(logging_handle.log_file_path);
    Ok(())
}

async fn run_wizard(config: &Config, linear: bool, controlled: bool) -> Result<()> {
    let directory = demo::directory_from_config(config);
    let wizard = demo::build_wizard(config, directory.clone(), linear, controlled);
    let mut session = Session::new(config, wizard, directory);

    println!("Registration Form");
    println!("Type 'help' for commands.");
    println!();
    println!("{}", session.render());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match session.handle_line(&line).await {
            Reply::Print(text) => println!("{}", text),
            Reply::Quit => break,
        }
    }

    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> Result<()> {
    let toml_str = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", toml_str);

    if save {
        config.save()?;
        println!("Saved to {}", Config::local_config_path().display());
    }
    Ok(())
}

fn cmd_shortcuts() {
    println!("Tab strip shortcuts");
    println!("{}", "─".repeat(40));
    for shortcut in SHORTCUTS {
        println!("{} {}", shortcut.key_display_padded(), shortcut.description);
    }
}

/// Print log file path on exit if logs were written
fn report_log_file(log_file_path: Option<PathBuf>) {
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }
}
