use std::path::{Path, PathBuf};

use assembly_guide_core::{
    AppConfig, EventBus, PlaybackRecord, RecordingAudioPlayer, RecordingCompletionUi,
    SequenceController, SessionSnapshot,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod script;

use script::{ScriptPlayer, SessionScript};

fn main() -> assembly_guide_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { run } => {
            let config = AppConfig::demo();
            let script = SessionScript::demo(&config);
            run_session(&config, &script, &run)
        }
        Commands::Run {
            config,
            script,
            run,
        } => {
            let config = AppConfig::from_json_file(&config)?;
            let script = match script {
                Some(path) => SessionScript::from_json_file(path)?,
                None => SessionScript::default_layout(&config),
            };
            run_session(&config, &script, &run)
        }
        Commands::CheckConfig { config } => check_config(&config),
    }
}

fn run_session(
    config: &AppConfig,
    script: &SessionScript,
    options: &RunOptions,
) -> assembly_guide_core::Result<()> {
    tracing::info!(
        steps = config.steps.len(),
        clips = config.audio.clips.len(),
        tick_hz = options.tick_hz,
        "starting session"
    );

    let scene = script.build_scene();
    let player = RecordingAudioPlayer::new();
    let ui = RecordingCompletionUi::new();
    let mut bus = EventBus::new();
    let mut controller = SequenceController::from_config(
        config,
        Box::new(scene.clone()),
        Box::new(player.clone()),
        Box::new(ui.clone()),
    )?;
    controller.initialize(&mut bus)?;

    let delta = 1.0 / options.tick_hz.max(1) as f32;
    let mut actions = ScriptPlayer::new(script);
    while controller.now() < options.max_seconds {
        actions.apply_due(controller.now(), config, &scene, &mut bus);
        controller.tick(delta, &mut bus);

        let settled = controller.is_idle() && controller.audio().is_idle();
        if settled && actions.is_finished() {
            break;
        }
    }

    if !controller.is_complete() {
        let (confirmed, total) = controller.progress();
        tracing::warn!(confirmed, total, "session ended before completion");
    }
    controller.teardown(&mut bus);

    let report = SessionReport {
        snapshot: controller.snapshot(),
        playback: player.records(),
        completion_shown: ui.times_shown(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_config(path: &Path) -> assembly_guide_core::Result<()> {
    let config = AppConfig::from_json_file(path)?;
    tracing::info!(
        ?path,
        steps = config.steps.len(),
        clips = config.audio.clips.len(),
        "configuration is valid"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Serialize)]
struct SessionReport {
    snapshot: SessionSnapshot,
    playback: Vec<PlaybackRecord>,
    completion_shown: usize,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Guided assembly sequencing host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct RunOptions {
    /// Simulation ticks per second.
    #[arg(long, default_value_t = 60)]
    tick_hz: u32,
    /// Stop the session after this many simulated seconds.
    #[arg(long, default_value_t = 60.0)]
    max_seconds: f32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in three-step scenario and print a session report.
    Demo {
        #[command(flatten)]
        run: RunOptions,
    },
    /// Run a session from a configuration file and an optional action script.
    Run {
        /// Path to the JSON session configuration.
        #[arg(short, long)]
        config: PathBuf,
        /// Path to a JSON script with the scene layout and timed host actions.
        #[arg(short, long)]
        script: Option<PathBuf>,
        #[command(flatten)]
        run: RunOptions,
    },
    /// Load and validate a configuration file.
    CheckConfig {
        /// Path to the JSON session configuration.
        config: PathBuf,
    },
}
