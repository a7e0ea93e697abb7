use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use dialoguekit_core::export::write_dataset;
use dialoguekit_core::{
    ClaudeClient, GeminiClient, LlmAdapter, OllamaClient, OpenAIClient, Orchestrator, Provider,
    Settings, Theme, DEFAULT_TARGET_TOTAL,
};
use tui::EventHandler;

const LOG_ENV: &str = "DIALOGUEKIT_LOG";

#[derive(Parser)]
#[command(name = "dialoguekit")]
#[command(about = "Generate persona conversation datasets with an LLM", version)]
struct Cli {
    /// Conversations to generate in one run
    #[arg(short, long, global = true, default_value_t = DEFAULT_TARGET_TOTAL)]
    target: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the theme catalog, marking the active ones
    Themes,
    /// Run one generation without the TUI and write the dataset file
    Generate {
        /// Directory the dataset file is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// List models known for the configured provider
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            init_file_logging()?;
            run_tui(Settings::load()?, cli.target).await
        }
        Some(command) => {
            init_stderr_logging();
            let settings = Settings::load()?;
            match command {
                Commands::Themes => list_themes(&settings),
                Commands::Generate { out } => generate(settings, cli.target, &out).await,
                Commands::Models => list_models(&settings).await,
            }
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// The TUI owns the terminal, so logs go to a file next to the settings
fn init_file_logging() -> Result<()> {
    let dir = Settings::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("dialoguekit.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .init();
}

async fn run_tui(settings: Settings, target: usize) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let sender = events.sender();

    let export_dir = std::env::current_dir()?;
    let mut app = App::new(settings, target, export_dir);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            if let Some(event) = events.next().await {
                handler::handle_event(&mut app, event, &sender).await?;
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

fn list_themes(settings: &Settings) -> Result<()> {
    println!("{}", "Theme catalog".bold().blue());
    for theme in Theme::catalog() {
        if settings.is_theme_active(&theme) {
            println!("  {} {}", "●".green(), theme);
        } else {
            println!("  {} {}", "○".dimmed(), theme.to_string().dimmed());
        }
    }
    println!(
        "\n{} of {} active",
        settings.active_themes.len().to_string().bold(),
        Theme::catalog().len()
    );
    Ok(())
}

async fn generate(settings: Settings, target: usize, out: &PathBuf) -> Result<()> {
    let orchestrator = Orchestrator::new(LlmAdapter::new(settings.adapter_config()), target);

    println!(
        "🤖 Generating {} conversations with {} ({})",
        target.to_string().bold(),
        settings.provider.display_name().bold().magenta(),
        settings.model()
    );

    let report = orchestrator
        .run(settings.snapshot(), |progress| match progress.theme {
            Some(theme) => println!(
                "  {} {:<32} +{:<3} {}/{}",
                "✓".green(),
                theme.to_string(),
                progress.added.len(),
                progress.count,
                progress.target
            ),
            None => println!("{}", "Run finished".dimmed()),
        })
        .await;

    if let Some(message) = report.message() {
        if report.notice.as_ref().map_or(false, |n| n.is_error()) {
            println!("{}", message.red());
        } else {
            println!("{}", message.yellow());
        }
    }

    if !report.items.is_empty() {
        let path = write_dataset(out, &settings.assistant_name, &report.items)?;
        println!("💾 Saved {} conversations to {}", report.count().to_string().bold(), path.display());
    }

    if let Some(notice) = report.notice.filter(|n| n.is_error()) {
        bail!(notice.message());
    }
    Ok(())
}

async fn list_models(settings: &Settings) -> Result<()> {
    let models = match settings.provider {
        Provider::Gemini => GeminiClient::list_models(),
        Provider::Claude => ClaudeClient::list_models(),
        Provider::OpenAI => OpenAIClient::list_models(),
        Provider::Ollama => {
            let client = OllamaClient::new(&settings.ollama_url, Duration::from_secs(10))?;
            client.list_models().await?
        }
    };

    println!("{}", format!("{} models", settings.provider.display_name()).bold().blue());
    let current = settings.model();
    for model in models {
        if model == current {
            println!("  {} {}", "*".green(), model.bold());
        } else {
            println!("    {}", model);
        }
    }
    Ok(())
}
