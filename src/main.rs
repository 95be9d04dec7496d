use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quantum_downloader::cli::{Cli, Commands};
use quantum_downloader::config::Config;
use quantum_downloader::extractors::YtDlpExtractor;
use quantum_downloader::formats::SearchResponse;
use quantum_downloader::{server, utils, Downloader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config --init` may point at a file that does not exist yet
    let mut config = match cli.command {
        Commands::Config { init: true, .. } => Config::default(),
        _ => Config::load(cli.config.as_deref())?,
    };
    init_tracing(&cli, &config);

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if static_dir.is_some() {
                config.server.static_dir = static_dir;
            }
            config.validate()?;

            // Check for required external dependencies (non-fatal)
            let missing_deps = utils::check_dependencies(&config.ytdlp.binary).await;
            for dep in missing_deps {
                tracing::warn!("Missing dependency: {}", dep);
            }

            let extractor = Arc::new(YtDlpExtractor::new(&config.ytdlp, config.download_timeout()));
            server::serve(&config, extractor).await?;
        }
        Commands::Inspect { url, json } => {
            let extractor = Arc::new(YtDlpExtractor::new(&config.ytdlp, config.download_timeout()));
            let downloader = Downloader::new(extractor, &config);

            quantum_downloader::extractors::validate_url(&url)?;
            let info = downloader.extract(&url).await?;
            let response = SearchResponse::from_media(&info);

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_summary(&response);
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                Config::default().save(&path)?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                println!("Config file: {}", Config::config_path()?.display());
                println!("Use --show to print it or --init to create it.");
            }
        }
        Commands::Check => {
            let missing_deps = utils::check_dependencies(&config.ytdlp.binary).await;
            if missing_deps.is_empty() {
                println!("All dependencies found.");
            } else {
                println!("Missing dependencies:");
                for dep in &missing_deps {
                    println!("  • {}", dep);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli, config: &Config) {
    let default_filter = if cli.verbose {
        "quantum_downloader=debug,tower_http=debug".to_string()
    } else {
        format!("quantum_downloader={},tower_http=info", config.log_level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_summary(response: &SearchResponse) {
    println!("{}", response.title);
    println!(
        "  by {} · {} · {} views",
        response.uploader,
        utils::format_duration(response.duration),
        response.view_count
    );

    println!("Video:");
    for tier in &response.formats {
        let size = match tier.descriptor.size() {
            0 => "size unknown".to_string(),
            bytes => utils::format_file_size(bytes),
        };
        println!(
            "  [{}] {} - {} ({})",
            tier.format_id(),
            tier.display_label,
            tier.descriptor.ext_upper(),
            size
        );
    }

    println!("Audio:");
    for option in &response.audio_formats {
        println!("  [{}] {}", option.format_id, option.quality_display);
    }
}
