//! stickwriter - Write disk images to removable drives
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stickwriter::headless::runner::{self, Confirmation, SettingsUpdate, WriteOptions};
use stickwriter::headless::HeadlessEvent;
use stickwriter_app::config;
use stickwriter_backend::LocalDiskBackend;
use stickwriter_core::prelude::*;
use stickwriter_core::{AppMode, ChecksumAlgorithm, Theme};

/// stickwriter - Write disk images to removable drives and verify the result
#[derive(Parser, Debug)]
#[command(name = "stickw", version)]
#[command(about = "Write disk images to removable drives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List removable devices
    Devices,

    /// Compute the digest of an image
    Checksum {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// sha256 or md5
        #[arg(short, long, default_value = "sha256")]
        algorithm: ChecksumAlgorithm,

        /// Published digest to compare against (case-insensitive)
        #[arg(long)]
        expected: Option<String>,
    },

    /// Inspect an image's format, optionally against a device's capacity
    Validate {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Device whose capacity the image must fit
        #[arg(long)]
        device: Option<String>,
    },

    /// Write an image to a device (destroys all data on it)
    Write {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[arg(value_name = "DEVICE")]
        device: String,

        /// Skip read-back verification
        #[arg(long)]
        no_verify: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Validate the image first (advanced mode)
        #[arg(long)]
        advanced: bool,

        /// Eject the device afterwards (advanced mode only)
        #[arg(long)]
        auto_eject: bool,
    },

    /// Show or change saved preferences
    Settings {
        #[arg(long)]
        theme: Option<Theme>,

        #[arg(long)]
        verify_after_write: Option<bool>,

        #[arg(long)]
        mode: Option<AppMode>,

        #[arg(long)]
        auto_eject: Option<bool>,

        #[arg(long)]
        show_notification: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Logs go to a file; stdout carries NDJSON only
    if let Err(e) = stickwriter_core::logging::init() {
        eprintln!("Warning: logging disabled: {}", e);
    }
    info!("stickw {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command).await {
        if e.is_recoverable() {
            warn!("{}", e);
        } else {
            error!("{}", e);
        }
        HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
        return Err(e.into());
    }
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let backend = LocalDiskBackend::new();

    match command {
        Command::Devices => runner::run_devices(&backend).await,

        Command::Checksum {
            image,
            algorithm,
            expected,
        } => runner::run_checksum(&backend, &image, algorithm, expected).await,

        Command::Validate { image, device } => {
            runner::run_validate(&backend, &image, device.as_deref()).await
        }

        Command::Write {
            image,
            device,
            no_verify,
            yes,
            advanced,
            auto_eject,
        } => {
            let preferences = config::load_preferences();
            let options = WriteOptions {
                image,
                device,
                verify: !no_verify && preferences.verify_after_write,
                confirmation: if yes {
                    Confirmation::AssumeYes
                } else {
                    Confirmation::Stdin
                },
                advanced,
                auto_eject,
            };
            runner::run_write(Arc::new(backend), preferences, options).await
        }

        Command::Settings {
            theme,
            verify_after_write,
            mode,
            auto_eject,
            show_notification,
        } => {
            let path = config::preferences_path()
                .ok_or_else(|| Error::config("No configuration directory on this system"))?;
            let update = SettingsUpdate {
                theme,
                verify_after_write,
                mode,
                auto_eject,
                show_notification,
            };
            runner::run_settings(&path, &update).map(|_| ())
        }
    }
}
