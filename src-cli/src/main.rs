mod args;
mod logging;
mod render;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;

use ingestwatch::{
    load_config, CancelOutcome, ClientConfig, ConfigError, FileSelection, IngestError,
    JobController, JobHandle, ProcessingSettings,
};

use crate::args::Args;
use crate::render::LogPrinter;

fn load_settings(path: Option<&Path>) -> ingestwatch::Result<ProcessingSettings> {
    let Some(path) = path else {
        return Ok(ProcessingSettings::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = serde_json::from_str(&content).map_err(ConfigError::ParseJson)?;
    Ok(settings)
}

/// Starts the job, resetting the server and retrying once on conflict when asked.
async fn start_job(
    controller: &mut JobController,
    selection: &FileSelection,
    settings: &ProcessingSettings,
    reset_on_conflict: bool,
) -> ingestwatch::Result<JobHandle> {
    match controller.start(selection, settings).await {
        Err(IngestError::AlreadyRunning) if reset_on_conflict => {
            log::warn!("Server reports a running job, resetting and retrying once");
            controller.reset().await?;
            controller.start(selection, settings).await
        }
        other => other,
    }
}

async fn run(args: Args, config: ClientConfig) -> ingestwatch::Result<ExitCode> {
    let settings = load_settings(args.settings.as_deref())?;
    let selection = FileSelection::new(args.files);
    let mut controller = JobController::from_config(&config)?;

    let handle = start_job(
        &mut controller,
        &selection,
        &settings,
        args.reset_on_conflict,
    )
    .await?;
    log::info!("Following job {}", handle.job_id);

    let (cancel_tx, mut cancel_rx) = mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = cancel_tx.send(());
    }) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let mut printer = LogPrinter::new();
    printer.print_new(controller.log());
    loop {
        tokio::select! {
            live = controller.pump() => {
                printer.print_new(controller.log());
                if !live {
                    break;
                }
            }
            Some(()) = cancel_rx.recv() => {
                match controller.request_cancel().await {
                    CancelOutcome::Requested => {
                        eprintln!("Cancelling, waiting for the server to stop...")
                    }
                    CancelOutcome::AlreadyCancelling => eprintln!("Already cancelling"),
                    CancelOutcome::NotRunning => {}
                }
            }
        }
    }

    if args.json {
        if let Some(snapshot) = controller.snapshot() {
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("{}", json),
                Err(e) => log::warn!("Could not serialize job snapshot: {}", e),
            }
        }
    }
    Ok(render::report(&controller))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = logging::init(&config.logging, args.log_level.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(1)
        }
    }
}
