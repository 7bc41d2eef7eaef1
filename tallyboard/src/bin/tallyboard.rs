use std::{
    env,
    io::Write,
    net::SocketAddr,
    path::{Path, PathBuf},
    process,
};

use clap::{Args, Parser, Subcommand};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;
use tallyboard::{
    config::{self, CONFIG_ENV, Config},
    export,
    fetch::Fetcher,
    refresh::{self, Cycle, Pipeline, Refresher, Snapshot},
    render::{self, Format},
    source::Source,
};
use tallyboard_engine::{
    Layout, Limits, ViewOptions,
    aggregate::{MediaFilter, WatchWindow},
};
use tokio::{
    runtime::Builder,
    signal,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Refresh cycle failed: {0}")]
    Cycle(#[from] refresh::Error),
    #[error("Failed to serialize dashboard: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to install prometheus recorder: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
    #[error("No endpoint given: pass --endpoint or set `endpoint` in the configuration")]
    NoEndpoint,
    #[error("Refresher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn parse_layout(s: &str) -> Result<Layout, String> {
    match s {
        "compact" => Ok(Layout::Compact),
        "wide" => Ok(Layout::Wide),
        _ => Err(format!("unknown layout {s:?}, expected compact or wide")),
    }
}

fn parse_window(s: &str) -> Result<WatchWindow, String> {
    match s {
        "lifetime" => Ok(WatchWindow::Lifetime),
        "daily" => Ok(WatchWindow::Daily),
        "weekly" => Ok(WatchWindow::Weekly),
        "monthly" => Ok(WatchWindow::Monthly),
        _ => Err(format!(
            "unknown window {s:?}, expected lifetime, daily, weekly or monthly"
        )),
    }
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an endpoint once, or repeatedly when `auto_refresh` is set
    Fetch(FetchCommand),
    /// Build the dashboard from a payload saved on disk
    Import(ImportCommand),
    /// Re-fetch an endpoint on the refresh interval until interrupted
    Watch(WatchCommand),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckCommand),
}

#[derive(Args)]
struct ViewArgs {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// table size preset, overrides the configuration
    #[clap(long, value_parser = parse_layout)]
    layout: Option<Layout>,
    /// output format
    #[clap(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// only titles whose title contains this text
    #[clap(long, conflicts_with = "provider")]
    title: Option<String>,
    /// only titles this provider served successfully
    #[clap(long)]
    provider: Option<String>,
    /// watch counter feeding the media view
    #[clap(long, value_parser = parse_window, default_value = "lifetime")]
    window: WatchWindow,
    /// address and port for prometheus exporter of tallyboard's own telemetry
    #[clap(long)]
    prometheus_addr: Option<SocketAddr>,
}

#[derive(Args)]
struct FetchCommand {
    #[command(flatten)]
    view: ViewArgs,
    /// metrics endpoint, overrides the configuration
    #[clap(long)]
    endpoint: Option<String>,
    /// directory to save the raw payload into
    #[clap(long)]
    save_raw: Option<PathBuf>,
}

#[derive(Args)]
struct ImportCommand {
    #[command(flatten)]
    view: ViewArgs,
    /// path on disk to a saved payload
    #[clap(long)]
    file: PathBuf,
}

#[derive(Args)]
struct WatchCommand {
    #[command(flatten)]
    view: ViewArgs,
    /// metrics endpoint, overrides the configuration
    #[clap(long)]
    endpoint: Option<String>,
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: PathBuf,
}

fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    let config = match path {
        Some(path) => Config::load(path),
        None => match env::var(CONFIG_ENV) {
            Ok(contents) => Config::from_yaml(&contents),
            Err(_) => Ok(Config::default()),
        },
    };
    config.map_err(|err| {
        error!("Configuration validation failed: {err}");
        Error::Config(err)
    })
}

fn view_options(config: &Config, args: &ViewArgs) -> ViewOptions {
    let mut options = config.view_options();
    if let Some(layout) = args.layout {
        options.limits = Limits::from(layout);
    }
    fn term(t: &Option<String>) -> Option<&str> {
        t.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
    options.media_filter = match (term(&args.title), term(&args.provider)) {
        (Some(title), _) => MediaFilter::Title(title.to_string()),
        (None, Some(provider)) => MediaFilter::Provider(provider.to_string()),
        (None, None) => MediaFilter::None,
    };
    options.watch_window = args.window;
    options
}

/// Raw payloads are only saved by single fetches.
fn save_raw_dir<'a>(config: &Config, save_raw: Option<&'a Path>) -> Option<&'a Path> {
    if config.auto_refresh && save_raw.is_some() {
        warn!("--save-raw is ignored while auto_refresh is enabled");
        return None;
    }
    save_raw
}

fn endpoint_source(config: &Config, flag: Option<&str>) -> Result<Source, Error> {
    let endpoint = flag
        .or(config.endpoint.as_deref())
        .ok_or(Error::NoEndpoint)?;
    Ok(Source::Endpoint(config::parse_endpoint(endpoint)?))
}

fn install_telemetry(addr: Option<SocketAddr>) -> Result<(), Error> {
    if let Some(addr) = addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("serving tallyboard telemetry on {addr}");
    }
    Ok(())
}

fn report(err: &refresh::Error) {
    if err.is_timeout() {
        error!("endpoint unreachable or too slow: {err}");
    } else {
        error!("payload rejected: {err}");
    }
}

fn emit(cycle: &Cycle, format: Format) -> Result<(), Error> {
    let out = render::render(&cycle.dashboard, format)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{out}")?;
    stdout.flush()?;
    Ok(())
}

async fn once(pipeline: Pipeline, format: Format, save_raw: Option<&Path>) -> Result<(), Error> {
    let cycle = pipeline.run().await.inspect_err(report)?;
    if let Some(dir) = save_raw {
        export::save(
            dir,
            pipeline.source().endpoint(),
            cycle.fetched_at.date_naive(),
            &cycle.raw,
        )
        .await?;
    }
    emit(&cycle, format)
}

async fn watch(pipeline: Pipeline, period: Duration, format: Format) -> Result<(), Error> {
    let (refresher, mut board) = Refresher::new(pipeline, period);
    let shutdown = CancellationToken::new();
    let refresher = tokio::spawn(refresher.run(shutdown.clone()));

    let mut interval = time::interval(Duration::from_millis(400));
    let res = loop {
        tokio::select! {
            _ = interval.tick() => {
                gauge!("tallyboard.running").set(1.0);
            },
            changed = board.changed() => {
                if changed.is_err() {
                    warn!("refresher stopped unexpectedly");
                    break Ok(());
                }
                let emitted = match &*board.borrow_and_update() {
                    Some(Snapshot { generation, outcome: Ok(cycle) }) => {
                        info!(generation, "dashboard refreshed");
                        emit(cycle, format)
                    }
                    Some(Snapshot { outcome: Err(err), .. }) => {
                        report(err);
                        Ok(())
                    }
                    None => Ok(()),
                };
                if let Err(err) = emitted {
                    break Err(err);
                }
            },
            _ = signal::ctrl_c() => {
                info!("received ctrl-c");
                break Ok(());
            },
        }
    };
    shutdown.cancel();
    refresher.await?;
    res
}

async fn inner_main(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Fetch(cmd) => {
            let config = load_config(cmd.view.config_path.as_deref())?;
            install_telemetry(cmd.view.prometheus_addr)?;
            let source = endpoint_source(&config, cmd.endpoint.as_deref())?;
            let pipeline = Pipeline::new(
                Fetcher::new(config.request_timeout()),
                source,
                view_options(&config, &cmd.view),
            );
            let save_raw = save_raw_dir(&config, cmd.save_raw.as_deref());
            if config.auto_refresh {
                watch(pipeline, config.refresh_interval(), cmd.view.format).await
            } else {
                once(pipeline, cmd.view.format, save_raw).await
            }
        }
        Commands::Import(cmd) => {
            let config = load_config(cmd.view.config_path.as_deref())?;
            install_telemetry(cmd.view.prometheus_addr)?;
            let pipeline = Pipeline::new(
                Fetcher::new(config.request_timeout()),
                Source::File(cmd.file),
                view_options(&config, &cmd.view),
            );
            once(pipeline, cmd.view.format, None).await
        }
        Commands::Watch(cmd) => {
            let config = load_config(cmd.view.config_path.as_deref())?;
            install_telemetry(cmd.view.prometheus_addr)?;
            let source = endpoint_source(&config, cmd.endpoint.as_deref())?;
            let pipeline = Pipeline::new(
                Fetcher::new(config.request_timeout()),
                source,
                view_options(&config, &cmd.view),
            );
            watch(pipeline, config.refresh_interval(), cmd.view.format).await
        }
        Commands::ConfigCheck(_) => unreachable!("handled before the runtime starts"),
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish()
        .init();

    let cli = Cli::parse();
    if let Commands::ConfigCheck(cmd) = &cli.command {
        match Config::load(&cmd.config_path) {
            Ok(_) => {
                info!("Configuration file is valid");
                process::exit(0)
            }
            Err(err) => {
                error!("Configuration validation failed: {err}");
                process::exit(1)
            }
        }
    }

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting tallyboard {version}.");

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(cli.command));
    info!("Bye. :)");
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "tallyboard",
            "fetch",
            "--endpoint",
            "http://localhost:9090/metrics",
            "--layout",
            "compact",
            "--format",
            "json",
            "--window",
            "weekly",
            "--provider",
            "alpha",
        ])
        .expect("valid arguments");
        let Commands::Fetch(cmd) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(cmd.endpoint.as_deref(), Some("http://localhost:9090/metrics"));
        assert_eq!(cmd.view.layout, Some(Layout::Compact));
        assert_eq!(cmd.view.format, Format::Json);

        let options = view_options(&Config::default(), &cmd.view);
        assert_eq!(options.limits, Limits::compact());
        assert_eq!(options.watch_window, WatchWindow::Weekly);
        assert_eq!(options.media_filter, MediaFilter::Provider("alpha".to_string()));
    }

    #[test]
    fn title_and_provider_filters_conflict() {
        assert!(
            Cli::try_parse_from([
                "tallyboard",
                "import",
                "--file",
                "payload.txt",
                "--title",
                "heat",
                "--provider",
                "alpha",
            ])
            .is_err()
        );
    }

    #[test]
    fn blank_search_terms_filter_nothing() {
        for flag in ["--title", "--provider"] {
            let cli = Cli::try_parse_from(["tallyboard", "import", "--file", "p.txt", flag, "  "])
                .expect("valid arguments");
            let Commands::Import(cmd) = cli.command else {
                panic!("expected import");
            };
            let options = view_options(&Config::default(), &cmd.view);
            assert_eq!(options.media_filter, MediaFilter::None);
        }
    }

    #[test]
    fn save_raw_ignored_under_auto_refresh() {
        let dir = Path::new("payloads");
        let mut config = Config::default();
        assert_eq!(save_raw_dir(&config, Some(dir)), Some(dir));
        config.auto_refresh = true;
        assert_eq!(save_raw_dir(&config, Some(dir)), None);
        assert_eq!(save_raw_dir(&config, None), None);
    }

    #[test]
    fn bad_layout_rejected() {
        assert!(
            Cli::try_parse_from(["tallyboard", "watch", "--layout", "huge"]).is_err()
        );
    }

    #[test]
    fn endpoint_flag_overrides_config() {
        let config = Config {
            endpoint: Some("http://config.example/metrics".to_string()),
            ..Config::default()
        };
        let source =
            endpoint_source(&config, Some("http://flag.example/metrics")).expect("valid");
        assert_eq!(source.to_string(), "http://flag.example/metrics");

        let source = endpoint_source(&config, None).expect("valid");
        assert_eq!(source.to_string(), "http://config.example/metrics");

        assert!(matches!(
            endpoint_source(&Config::default(), None),
            Err(Error::NoEndpoint)
        ));
        assert!(matches!(
            endpoint_source(&Config::default(), Some("nope")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn import_saved_payload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, "mw_user_count 12\n").expect("write");
        let pipeline = Pipeline::new(
            Fetcher::new(Duration::from_secs(1)),
            Source::File(path),
            ViewOptions::default(),
        );
        once(pipeline, Format::Json, None).await.expect("import succeeds");
    }
}
