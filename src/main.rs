//! xrinteract - pointer interaction and XR session lifecycle
//!
//! Headless simulator: runs the session manager, frame driver and interaction
//! engine against a scripted XR host and prints a run summary as JSON.

mod config;
mod headless;
mod scripted_input;

use anyhow::{Context, Result};
use config::XrConfig;
use std::{env, path::PathBuf};
use tracing::info;

const DEFAULT_FRAMES: u64 = 300;

fn main() -> Result<()> {
    // WARN by default; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting xrinteract v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut config = match &cli.config {
        Some(path) => XrConfig::load_from_path(path),
        None => XrConfig::load(),
    };
    if let Some(resolution) = cli.resolution {
        config.resolution = resolution;
    }

    if let Some(path) = &cli.write_config {
        config
            .save_to_path(path)
            .with_context(|| format!("writing config to {}", path.display()))?;
        info!(path = %path.display(), "config written");
        return Ok(());
    }

    if let Some(at) = cli.enter_immersive_at {
        if at >= cli.frames {
            tracing::warn!(at, frames = cli.frames, "--enter-immersive-at is past the last frame");
        }
    }

    let summary = headless::run(headless::HeadlessConfig {
        config,
        script: cli.script,
        frames: cli.frames,
        enter_immersive_at: cli.enter_immersive_at,
        trace: cli.trace,
    })?;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
    frames: u64,
    enter_immersive_at: Option<u64>,
    resolution: Option<(u32, u32)>,
    trace: Option<PathBuf>,
    write_config: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            config: None,
            script: None,
            frames: DEFAULT_FRAMES,
            enter_immersive_at: None,
            resolution: None,
            trace: None,
            write_config: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--script" => {
                    if let Some(path) = args.next() {
                        opts.script = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--script requires a file path");
                    }
                }
                "--trace" => {
                    if let Some(path) = args.next() {
                        opts.trace = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--trace requires a file path");
                    }
                }
                "--write-config" => {
                    if let Some(path) = args.next() {
                        opts.write_config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--write-config requires a file path");
                    }
                }
                "--frames" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.frames = value,
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--frames must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--frames requires an integer");
                    }
                }
                "--enter-immersive-at" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.enter_immersive_at = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--enter-immersive-at must be a frame number");
                            }
                        }
                    } else {
                        tracing::error!("--enter-immersive-at requires a frame number");
                    }
                }
                "--resolution" => {
                    if let Some(raw) = args.next() {
                        match raw.split_once('x') {
                            Some((w, h)) => match (w.parse::<u32>(), h.parse::<u32>()) {
                                (Ok(width), Ok(height)) if width > 0 && height > 0 => {
                                    opts.resolution = Some((width, height));
                                }
                                _ => {
                                    tracing::error!(value = %raw, "--resolution must be like 1280x720");
                                }
                            },
                            None => {
                                tracing::error!(value = %raw, "--resolution must be like 1280x720");
                            }
                        }
                    } else {
                        tracing::error!("--resolution requires a value like 1280x720");
                    }
                }
                other => {
                    tracing::warn!(arg = other, "ignoring unknown argument");
                }
            }
        }

        opts
    }
}
