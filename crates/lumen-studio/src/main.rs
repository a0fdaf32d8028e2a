mod catalog;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use lumen_engine::device::ClearEngine;
use lumen_engine::imaging::ImageSource;
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::session::{
    assemble_arguments, AssetContext, LaunchCommand, LaunchRequest, SessionConfig,
};
use lumen_engine::window::{Runtime, RuntimeConfig};

use catalog::SampleInfo;

#[derive(Debug, Parser)]
#[command(author, version, about = "Launch a lumen sample in a window")]
struct Cli {
    /// Sample to run.
    #[arg(long, value_name = "ID", conflicts_with_all = ["test", "raw"])]
    sample: Option<String>,
    /// Test to run.
    #[arg(long, value_name = "ID", conflicts_with = "raw")]
    test: Option<String>,
    /// Log frames per second and present without vsync.
    #[arg(long)]
    benchmark: bool,
    /// Run without showing the window.
    #[arg(long)]
    headless: bool,
    /// Image to hand to the sample at startup.
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,
    /// Read-only sample assets.
    #[arg(long, value_name = "DIR", default_value = "assets")]
    assets: PathBuf,
    /// Log filter, e.g. `debug` or `lumen_engine=trace`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
    /// List known samples and exit.
    #[arg(long)]
    list: bool,
    /// Raw engine arguments, passed through as given.
    #[arg(last = true, value_name = "ARGS")]
    raw: Vec<String>,
}

impl Cli {
    fn launch_request(&self) -> LaunchRequest {
        let command = if let Some(id) = &self.sample {
            LaunchCommand::Sample(id.clone())
        } else if let Some(id) = &self.test {
            LaunchCommand::Test(id.clone())
        } else if !self.raw.is_empty() {
            LaunchCommand::Raw(self.raw.clone())
        } else {
            LaunchCommand::Default
        };

        LaunchRequest {
            command,
            benchmark: self.benchmark,
            headless: self.headless,
        }
    }
}

/// Resolves a sample request against the catalog. Other commands are not
/// catalogued and never need input.
fn resolve(command: &LaunchCommand) -> Result<Option<&'static SampleInfo>> {
    match command {
        LaunchCommand::Sample(id) => match catalog::find(id) {
            Some(info) => Ok(Some(info)),
            None => bail!("could not find sample {id}"),
        },
        _ => Ok(None),
    }
}

fn print_catalog() {
    for sample in catalog::SAMPLES {
        let input = if sample.requires_input { " (needs an image)" } else { "" };
        println!(
            "{:<30} {:<12} {}{input}",
            sample.id, sample.category, sample.description
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(match &cli.log {
        Some(filter) => LoggingConfig::with_filter(filter.clone()),
        None => LoggingConfig::default(),
    });

    if cli.list {
        print_catalog();
        return Ok(());
    }

    let request = cli.launch_request();
    let sample = resolve(&request.command)?;
    let args = assemble_arguments(&request);

    let requires_input = sample.is_some_and(|s| s.requires_input);
    if requires_input && cli.image.is_none() {
        log::info!("drop an image on the window to start the sample");
    }

    let session = SessionConfig {
        args,
        requires_input,
        assets: AssetContext::with_asset_root(cli.assets),
        ..SessionConfig::default()
    };

    let window = RuntimeConfig {
        title: match sample {
            Some(info) => format!("lumen - {}", info.name),
            None => "lumen".to_string(),
        },
        visible: !cli.headless,
        ..RuntimeConfig::default()
    };

    Runtime::run(
        window,
        ClearEngine::new(),
        session,
        cli.image.map(ImageSource::Path),
    )
}
