use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};

use uploader::state::Phase;
use uploader::{App, ClientConfig, MediaFile, ResultView};

#[derive(Parser)]
#[command(name = "uploader", version, about = "Convert images and videos to ASCII art")]
struct Cli {
    /// Config file read before the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and wait for its conversion
    Convert {
        file: PathBuf,

        /// Copy the ASCII text to the clipboard
        #[arg(long)]
        copy: bool,

        /// Save the result into this directory
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },
    /// Show or switch the colour theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ThemeAction {
    Show,
    Toggle,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    common::telemetry::init_tracing(Level::INFO)?;

    let config = ClientConfig::load(cli.config.as_deref())?;
    let mut app = App::from_config(&config).await?;

    match cli.command {
        Command::Convert {
            file,
            copy,
            download_dir,
        } => convert(&mut app, file, copy, download_dir).await,
        Command::Theme { action } => {
            if let Some(ThemeAction::Toggle) = action {
                app.toggle_theme().await?;
            }
            println!("{}", app.theme());
            Ok(())
        }
    }
}

async fn convert(
    app: &mut App,
    file: PathBuf,
    copy: bool,
    download_dir: Option<PathBuf>,
) -> Result<()> {
    let media = MediaFile::open(&file).await?;
    let session = app.session_mut();

    if session.select(media) {
        session.settle().await;
    }
    report_alerts(app);

    let view = app.snapshot().view;
    if view.phase != Phase::ResultReady {
        anyhow::bail!("Conversion of {} failed", file.display());
    }

    match &view.result {
        Some(ResultView::Text { ascii, .. }) => println!("{ascii}"),
        Some(ResultView::Media {
            url, content_type, ..
        }) => info!("Received {} as {}", content_type, url),
        None => {}
    }

    let session = app.session_mut();
    if copy {
        session.copy_result().await;
    }
    let saved = match download_dir {
        Some(dir) => Some(session.download(&dir).await),
        None => None,
    };
    report_alerts(app);

    if let Some(path) = saved.transpose()? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn report_alerts(app: &mut App) {
    for alert in app.session_mut().take_alerts() {
        eprintln!("{alert}");
    }
}
