mod ui;

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{info, warn};
use telehud::{
    AppConfig, DisplayMode, DisplaySession, FrameOutcome, HudError, TelemetryFrame,
    builtin_registry, writer,
};
use ui::live::LiveHudApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file to use instead of the one in the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the live HUD window
    Live {
        #[arg(short, long)]
        program: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a session headless at a fixed frame rate
    Run {
        #[arg(short, long)]
        program: Option<String>,

        #[arg(short, long, default_value_t = 10_000)]
        duration_ms: u64,

        #[arg(short, long, default_value_t = 16)]
        frame_ms: u64,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run with widened attract-mode intervals
        #[arg(short, long)]
        attract: bool,
    },
    /// List the registered programs
    Programs,
    /// Print the CRT shader uniforms as JSON
    Uniforms,
}

fn load_config(path: Option<&Path>, program: Option<&String>) -> Result<AppConfig, HudError> {
    let mut config = match path {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::from_local_file()?.unwrap_or_default(),
    };
    if let Some(program) = program {
        config.program = Some(program.clone());
    }
    config.validate()?;
    Ok(config)
}

type WriterHandle = thread::JoinHandle<Result<(), HudError>>;

fn spawn_writer(
    output: Option<PathBuf>,
) -> (Option<Sender<TelemetryFrame>>, Option<WriterHandle>) {
    match output {
        Some(output_file) => {
            let (tx, rx) = mpsc::channel::<TelemetryFrame>();
            let handle = thread::spawn(move || writer::write_telemetry(&output_file, rx));
            (Some(tx), Some(handle))
        }
        None => (None, None),
    }
}

fn live(
    config: AppConfig,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), HudError> {
    let registry = Arc::new(builtin_registry()?);
    let session = DisplaySession::from_config(registry, &config)?;
    let (recorder, writer_handle) = spawn_writer(output);

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(
            config.surface_width as f32 + 260.,
            config.surface_height as f32 + 140.,
        ))
        .with_title("Telehud");

    eframe::run_native(
        "Telehud",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(LiveHudApp::new(
                session,
                config,
                config_path,
                recorder,
                cc,
            )))
        }),
    )
    .expect("could not start app");
    join_writer(writer_handle)
}

fn join_writer(handle: Option<WriterHandle>) -> Result<(), HudError> {
    match handle.map(|h| h.join()) {
        Some(Ok(result)) => result,
        Some(Err(_)) => {
            warn!("Telemetry writer thread panicked");
            Ok(())
        }
        None => Ok(()),
    }
}

fn run(
    config: AppConfig,
    duration_ms: u64,
    frame_ms: u64,
    output: Option<PathBuf>,
    attract: bool,
    running: Arc<AtomicBool>,
) -> Result<(), HudError> {
    let registry = Arc::new(builtin_registry()?);
    let mut session = DisplaySession::from_config(registry, &config)?;
    if attract {
        session.set_mode(DisplayMode::Attract);
    }
    info!(
        "Running '{}' for {} ms at {} ms/frame",
        session.active_program().id,
        duration_ms,
        frame_ms
    );

    let (recorder, writer_handle) = spawn_writer(output);
    let started = Instant::now();
    let frame = Duration::from_millis(frame_ms.max(1));
    let mut next_frame = started;
    while running.load(Ordering::SeqCst) {
        let now_ms = started.elapsed().as_millis() as u64;
        if now_ms >= duration_ms {
            break;
        }
        if session.frame(now_ms) == FrameOutcome::Rendered {
            if let Some(tx) = &recorder {
                tx.send(session.snapshot(now_ms))?;
            }
        }
        next_frame += frame;
        if let Some(wait) = next_frame.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    drop(recorder);
    join_writer(writer_handle)?;

    let stats = session.stats();
    let telemetry = session.telemetry();
    println!(
        "{}: {} renders, {} failures, {} skipped frames, status {} (generation {})",
        session.active_program().id,
        stats.renders,
        stats.failures,
        stats.skipped,
        telemetry.system.status,
        telemetry.generation
    );
    Ok(())
}

fn programs() -> Result<(), HudError> {
    let registry = builtin_registry()?;
    for (index, program) in registry.iter().enumerate() {
        println!(
            "{:>2}  {:<14} {:<16} {:>4} ms",
            index, program.id, program.label, program.preferred_interval_ms
        );
    }
    Ok(())
}

fn uniforms(config: &AppConfig) -> Result<(), HudError> {
    let json = serde_json::to_string_pretty(&config.crt.uniforms())
        .map_err(|e| HudError::ConfigSerializeError { source: e })?;
    println!("{}", json);
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    let headless = matches!(cli.command, Commands::Run { .. });
    ctrlc::set_handler(move || {
        println!("Exiting...");
        // a headless run stops at the next frame so the recording gets flushed
        if !headless || !handler_flag.swap(false, Ordering::SeqCst) {
            std::process::exit(0);
        }
    })
    .expect("Could not set Ctrl-C handler");

    match &cli.command {
        Commands::Live { program, output } => {
            let config = load_config(cli.config.as_deref(), program.as_ref())
                .expect("Error while loading configuration");
            live(config, cli.config.clone(), output.clone())
                .expect("Error while running live HUD")
        }
        Commands::Run {
            program,
            duration_ms,
            frame_ms,
            output,
            attract,
        } => {
            let config = load_config(cli.config.as_deref(), program.as_ref())
                .expect("Error while loading configuration");
            run(
                config,
                *duration_ms,
                *frame_ms,
                output.clone(),
                *attract,
                running,
            )
            .expect("Error while running headless session")
        }
        Commands::Programs => programs().expect("Error while listing programs"),
        Commands::Uniforms => {
            let config = load_config(cli.config.as_deref(), None)
                .expect("Error while loading configuration");
            uniforms(&config).expect("Error while printing uniforms")
        }
    };
}
