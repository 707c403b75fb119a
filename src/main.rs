//! Agent Embed - Embeddable chat widget for hosted AI agents
//!
//! Command-line companion: prints iframe URLs and embed snippets, and drives
//! a headless widget through scripted interactions.

use agent_embed::{
    config::EmbedConfig,
    embed,
    runtime::{TimerQueue, WidgetRuntime},
    widget::{HeadlessDom, ManualScheduler, WidgetBuilder, WidgetHooks},
    WidgetConfig, WidgetOptions,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agent-embed")]
#[command(author = "Agent Embed Team")]
#[command(version)]
#[command(about = "Embeddable chat widget for hosted AI agents")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AGENT_EMBED_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Widget options; each one overrides the `[widget]` section
#[derive(Args, Default)]
struct WidgetArgs {
    /// Agent to embed
    #[arg(long)]
    agent_id: Option<String>,

    /// light | dark
    #[arg(long)]
    theme: Option<String>,

    /// bottom-right | bottom-left | top-right | top-left
    #[arg(long)]
    position: Option<String>,

    /// small | medium | large
    #[arg(long)]
    button_size: Option<String>,

    /// none | small | medium | large
    #[arg(long)]
    border_radius: Option<String>,

    /// Show the agent image in the embedded UI
    #[arg(long)]
    show_agent_image: Option<bool>,
}

impl WidgetArgs {
    fn options(&self) -> WidgetOptions {
        WidgetOptions {
            agent_id: self.agent_id.clone(),
            theme: self.theme.clone(),
            position: self.position.clone(),
            button_size: self.button_size.clone(),
            border_radius: self.border_radius.clone(),
            show_agent_image: self.show_agent_image,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the iframe URL for a widget
    Url {
        #[command(flatten)]
        widget: WidgetArgs,
    },

    /// Print the embed snippet for a host page
    Snippet {
        #[command(flatten)]
        widget: WidgetArgs,
    },

    /// Drive a headless widget through a JSON-lines script
    Simulate {
        /// Script file, or '-' for stdin
        #[arg(short, long, default_value = "-")]
        script: PathBuf,

        /// Inner height of the simulated window
        #[arg(long, default_value_t = 800.0)]
        viewport: f64,

        /// Use the tokio runtime and wall-clock timers
        #[arg(long)]
        realtime: bool,

        #[command(flatten)]
        widget: WidgetArgs,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

/// One line of a simulation script
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum ScriptStep {
    Toggle,
    Open,
    Close,
    /// Deliver a message; `origin` defaults to the remote origin
    Message {
        #[serde(default)]
        origin: Option<String>,
        payload: Value,
    },
    /// Fire the pending animation frame, then let `ms` pass
    Wait { ms: u64 },
    /// Change the window inner height
    Viewport { height: f64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so stdout stays machine-readable)
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("agent_embed={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        EmbedConfig::load(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        EmbedConfig::default()
    };

    match cli.command {
        Commands::Url { widget } => {
            let widget_config = resolve(&config, &widget)?;
            println!(
                "{}",
                widget_config.iframe_url(&config.host.remote_origin, &config.host.frame_path)
            );
        }
        Commands::Snippet { widget } => {
            let widget_config = resolve(&config, &widget)?;
            print!("{}", embed::snippet(&config, &widget_config)?);
        }
        Commands::Simulate {
            script,
            viewport,
            realtime,
            widget,
        } => {
            let widget_config = resolve(&config, &widget)?;
            let steps = read_script(&script)?;
            if realtime {
                simulate_realtime(&config, widget_config, viewport, steps).await?;
            } else {
                simulate(&config, widget_config, viewport, steps)?;
            }
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn resolve(config: &EmbedConfig, args: &WidgetArgs) -> Result<WidgetConfig> {
    let options = config.widget.overlay(&args.options());
    Ok(WidgetConfig::merge(&options)?)
}

fn read_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let reader: Box<dyn BufRead> = if path == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open script {}", path.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut steps = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step: ScriptStep = serde_json::from_str(line)
            .with_context(|| format!("Invalid script step on line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

fn simulation_hooks() -> WidgetHooks {
    WidgetHooks::new()
        .on_relay(|data| println!("{}", json!({ "relay": data })))
        .on_diagnostic(|diagnostic| tracing::debug!(?diagnostic, "Widget diagnostic"))
}

fn page(config: &EmbedConfig, viewport: f64) -> HeadlessDom {
    let mut dom = HeadlessDom::new(viewport);
    dom.add_container(&config.host.container_id);
    dom
}

fn simulate(
    config: &EmbedConfig,
    widget_config: WidgetConfig,
    viewport: f64,
    steps: Vec<ScriptStep>,
) -> Result<()> {
    let remote = config.host.remote_origin.to_string();
    let mut widget = WidgetBuilder::new(widget_config)
        .settings(config.widget_settings())
        .hooks(simulation_hooks())
        .mount(page(config, viewport), ManualScheduler::new());

    for step in steps {
        match step {
            ScriptStep::Toggle => widget.toggle(),
            ScriptStep::Open => widget.open(),
            ScriptStep::Close => widget.close(),
            ScriptStep::Message { origin, payload } => {
                widget.handle_message(origin.as_deref().unwrap_or(remote.as_str()), &payload)
            }
            ScriptStep::Wait { ms } => {
                widget.flush_frame();
                widget.advance(Duration::from_millis(ms));
            }
            ScriptStep::Viewport { height } => widget.render_mut().set_viewport_height(height),
        }
        for message in widget.render_mut().take_outbox() {
            println!("{}", json!({ "posted": message.payload }));
        }
    }

    println!("{}", serde_json::to_string(&widget.snapshot())?);
    Ok(())
}

async fn simulate_realtime(
    config: &EmbedConfig,
    widget_config: WidgetConfig,
    viewport: f64,
    steps: Vec<ScriptStep>,
) -> Result<()> {
    let remote = config.host.remote_origin.to_string();
    let widget = WidgetBuilder::new(widget_config)
        .settings(config.widget_settings())
        .hooks(simulation_hooks())
        .mount(page(config, viewport), TimerQueue::new(config.frame_interval()));
    let (handle, join) = WidgetRuntime::spawn(widget);

    for step in steps {
        match step {
            ScriptStep::Toggle => handle.toggle().await?,
            ScriptStep::Open => handle.open().await?,
            ScriptStep::Close => handle.close().await?,
            ScriptStep::Message { origin, payload } => {
                handle
                    .deliver(origin.unwrap_or_else(|| remote.clone()), payload)
                    .await?
            }
            ScriptStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            ScriptStep::Viewport { .. } => {
                tracing::warn!("Viewport changes are not supported with --realtime; ignoring");
            }
        }
    }

    let snapshot = handle.snapshot().await?;
    drop(handle);
    let widget = join.await?;
    for message in widget.render().outbox() {
        println!("{}", json!({ "posted": message.payload }));
    }
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}

fn show_config(config: Option<&EmbedConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
