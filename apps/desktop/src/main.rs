mod backend_bridge;
mod config;
mod controller;
mod export;
mod picker;
mod preview;
mod shell;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use shared::domain::{ColorCorrection, ImageSlot, Strength};
use tracing_subscriber::EnvFilter;

use crate::{backend_bridge::runtime, config::Settings};

#[derive(Parser, Debug)]
#[command(name = "faceswap", about = "Face extraction and face swap front-end")]
struct Cli {
    /// Config file; defaults to ./faceswap.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    engine_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Detect and crop every face in an image.
    Extract {
        image: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Put the source face onto the target image.
    Swap {
        source: PathBuf,
        target: PathBuf,
        /// Color correction in [0, 1]; automatic when omitted.
        #[arg(long)]
        strength: Option<f64>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Interactive session (default).
    Shell,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    apply_cli_overrides(&mut settings, &cli);
    tracing::info!(
        engine_url = settings.engine_url.as_deref().unwrap_or("<unset>"),
        export_dir = %settings.export_dir.display(),
        "faceswap starting"
    );

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => run_shell(settings),
        Command::Extract { image, out } => {
            if let Some(out) = out {
                settings.export_dir = out;
            }
            block_on(extract_once(settings, image))
        }
        Command::Swap {
            source,
            target,
            strength,
            out,
        } => {
            if let Some(out) = out {
                settings.export_dir = out;
            }
            block_on(swap_once(settings, source, target, strength))
        }
    }
}

fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(url) = &cli.engine_url {
        settings.engine_url = Some(url.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = &cli.export_dir {
        settings.export_dir = dir.clone();
    }
}

fn run_shell(settings: Settings) -> Result<()> {
    let (cmd_tx, cmd_rx) = bounded(256);
    let (ui_tx, ui_rx) = bounded(2048);
    let worker = runtime::launch(cmd_rx, ui_tx, settings);
    shell::run(cmd_tx, ui_rx)?;
    if worker.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    Ok(())
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?
        .block_on(future)
}

async fn extract_once(settings: Settings, image: PathBuf) -> Result<()> {
    let controller = runtime::build_controller(&settings)?;
    let image = picker::resolve_selection(Some(&image))?;
    controller.select_image(ImageSlot::Source, image).await;

    let faces = controller.extract().await?;
    if faces.is_empty() {
        println!("no faces found");
        return Ok(());
    }
    for (index, face) in faces.iter().enumerate() {
        println!("{}", preview::describe_face(index, face));
    }
    for path in export::export_extraction(&settings.export_dir, &faces)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}

async fn swap_once(
    settings: Settings,
    source: PathBuf,
    target: PathBuf,
    strength: Option<f64>,
) -> Result<()> {
    let controller = runtime::build_controller(&settings)?;
    for (slot, path) in [(ImageSlot::Source, source), (ImageSlot::Target, target)] {
        let image = picker::resolve_selection(Some(&path))?;
        controller.select_image(slot, image).await;
    }
    if let Some(value) = strength {
        let strength = Strength::new(value).context("invalid --strength")?;
        controller
            .set_color_correction(ColorCorrection::Manual(strength))
            .await;
    }

    let result = controller.swap().await?;
    let label = controller.strength_display().await.label();
    println!(
        "{}, color correction {label}",
        preview::describe_swap(&result)
    );
    let path = export::export_composite(&settings.export_dir, &result, Local::now())?;
    println!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_shell_without_subcommand() {
        let cli = Cli::try_parse_from(["faceswap"]).expect("parse");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_swap_with_global_overrides() {
        let cli = Cli::try_parse_from([
            "faceswap",
            "swap",
            "/a.png",
            "/b.jpg",
            "--strength",
            "0.7",
            "--engine-url",
            "http://127.0.0.1:5000",
        ])
        .expect("parse");
        assert_eq!(
            cli.command,
            Some(Command::Swap {
                source: PathBuf::from("/a.png"),
                target: PathBuf::from("/b.jpg"),
                strength: Some(0.7),
                out: None,
            })
        );

        let mut settings = Settings::default();
        apply_cli_overrides(&mut settings, &cli);
        assert_eq!(
            settings.engine_url.as_deref(),
            Some("http://127.0.0.1:5000")
        );
    }

    #[test]
    fn timeout_override_applies() {
        let cli =
            Cli::try_parse_from(["faceswap", "--timeout-secs", "30", "shell"]).expect("parse");
        let mut settings = Settings::default();
        apply_cli_overrides(&mut settings, &cli);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(cli.command, Some(Command::Shell));
    }
}
