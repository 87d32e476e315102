use clap::Parser;
use site_config::{Settings, SiteConfigService};
use site_config_cli::cli::{Cli, Commands};
use site_config_cli::{commands, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let settings = Settings::load(cli.config.as_deref())?;
    let mut service = SiteConfigService::from_settings(&settings).await?;
    if let Some(lang) = &cli.lang {
        if !site_config::is_valid_langcode(lang) {
            anyhow::bail!("invalid language code '{lang}'");
        }
        service = service.with_language(lang);
    }

    let output = match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or(settings.bind);
            return server::serve(service, &bind).await;
        }
        Commands::List => commands::list(&service)?,
        Commands::Get { entry, field } => commands::get(&service, &entry, field.as_deref())?,
        Commands::Set {
            entry,
            field,
            value,
        } => commands::set(&service, &entry, &field, &value)?,
        Commands::Form { entry } => commands::form(&service, entry.as_deref())?,
    };

    println!("{output}");
    Ok(())
}

/// Log to stderr. `RUST_LOG` overrides the level picked by the flags.
fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hyper=warn,{log_level}")));

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
