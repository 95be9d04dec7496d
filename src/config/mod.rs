use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Local download settings
    pub download: DownloadConfig,

    /// yt-dlp invocation
    pub ytdlp: YtDlpConfig,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// CORS origins, "*" allows any
    pub allowed_origins: Vec<String>,

    /// Directory with the web front-end, served at "/"
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Parent of per-request job directories (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,

    /// Largest file served by the file download endpoint, in bytes
    pub max_file_size: u64,

    /// Upper bound for any single yt-dlp run
    pub download_timeout_secs: u64,

    /// MP3 bitrate used when converting audio
    pub audio_bitrate_kbps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    /// Executable name or path
    pub binary: String,

    /// Arguments prepended to every invocation
    pub extra_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            download: DownloadConfig::default(),
            ytdlp: YtDlpConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: vec!["*".to_string()],
            static_dir: None,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            max_file_size: 500 * 1024 * 1024,
            download_timeout_secs: 300,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the usual locations, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().ok().filter(|path| path.exists()),
        };

        let Some(path) = path else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        tracing::debug!("Loading config from {}", path.display());
        let content = fs_err::read_to_string(&path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("quantum-downloader").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }

        if self.download.download_timeout_secs == 0 {
            anyhow::bail!("download_timeout_secs must be greater than zero");
        }

        if self.download.audio_bitrate_kbps == 0 {
            anyhow::bail!("audio_bitrate_kbps must be greater than zero");
        }

        if self.ytdlp.binary.trim().is_empty() {
            anyhow::bail!("yt-dlp binary must be configured");
        }

        let host = self.server.host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            anyhow::bail!("Invalid server host: {:?}", self.server.host);
        }

        Ok(())
    }

    /// Address the server listens on, as "host:port"
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download.download_timeout_secs)
    }

    /// Parent directory for download jobs
    pub fn temp_root(&self) -> PathBuf {
        self.download
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("quantum-downloader")
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Allowed Origins: {}", self.server.allowed_origins.join(", "));
        if let Some(dir) = &self.server.static_dir {
            println!("  Static Files: {}", dir.display());
        }
        println!("  Temp Dir: {}", self.temp_root().display());
        println!(
            "  Max File Size: {}",
            crate::utils::format_file_size(self.download.max_file_size)
        );
        println!("  Download Timeout: {}s", self.download.download_timeout_secs);
        println!("  MP3 Bitrate: {}kbps", self.download.audio_bitrate_kbps);
        println!("  yt-dlp: {}", self.ytdlp.binary);
        println!("  Log Level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.listen_address(), "0.0.0.0:5000");
        assert_eq!(config.download.max_file_size, 524_288_000);
        assert_eq!(config.download_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.server.port = 8080;
        config.ytdlp.extra_args = vec!["--force-ipv4".to_string()];
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "server:\n  port: 9000\n").unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.server.host, "0.0.0.0");
        assert_eq!(loaded.download.audio_bitrate_kbps, 192);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.download.audio_bitrate_kbps = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_temp_root() {
        let mut config = Config::default();
        config.download.temp_dir = Some(PathBuf::from("/var/tmp"));
        assert_eq!(config.temp_root(), PathBuf::from("/var/tmp/quantum-downloader"));
    }
}
