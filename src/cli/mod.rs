use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quantum-downloader",
    about = "Quantum Downloader - list quality tiers for online videos and download them as video or MP3",
    version,
    long_about = "A web service and CLI on top of yt-dlp. It groups the available streams of a video page into Low, Standard and High quality tiers, offers MP3 conversion, and resolves or downloads the chosen variant."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML config file
    #[arg(short, long, global = true, value_name = "FILE", env = "QUANTUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Directory with the web front-end
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Show the quality tiers and audio options for a URL
    Inspect {
        /// Page URL of the video
        #[arg(value_name = "URL")]
        url: String,

        /// Print the raw search response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config path
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}
