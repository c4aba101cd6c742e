use feedwire::cli::{parse_args, version_line, CliCommand, USAGE};
use feedwire::config::ChannelConfig;
use feedwire::domain::ConnectionPhase;
use feedwire::live::{subscribe_default, EventHandlers};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let options = match parse_args(std::env::args())? {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        CliCommand::Run(options) => options,
    };

    init_tracing();

    let config = ChannelConfig::from_env().wrap_err("invalid FEEDWIRE_* environment")?;
    let config = options.apply(config).wrap_err("invalid command-line arguments")?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config))
}

async fn run(config: ChannelConfig) -> Result<()> {
    tracing::info!(
        "Subscribing to {} via {:?}",
        config.endpoint,
        config.transports
    );

    let handlers = EventHandlers::new().on_new_item(|article| {
        match article.category.as_deref() {
            Some(category) => println!("[{}] {} - {}", category, article.title, article.teaser()),
            None => println!("{} - {}", article.title, article.teaser()),
        }
        Ok(())
    });
    let mut handle = subscribe_default(config, handlers);
    let mut phases = handle.phase_receiver();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.wrap_err("failed to listen for Ctrl-C")?;
            handle.cancel();
        }
        _ = phases.wait_for(ConnectionPhase::is_terminal) => {}
    }

    handle.join().await;
    let stats = handle.stats();
    tracing::info!(
        "Stopped in phase {} ({} delivered, {} rejected, {} faulted)",
        handle.current_phase(),
        stats.delivered,
        stats.rejected,
        stats.faulted
    );
    Ok(())
}
