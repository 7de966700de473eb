use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::catalog::ScanOptions;

const DEFAULT_GEOCODE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Directory served statically; the output slots are written here.
    pub html_dir: PathBuf,
    /// Directory scanned recursively for media.
    pub media_dir: PathBuf,
    pub listen_addr: SocketAddr,
    /// Catalog `.mov` files alongside photos.
    pub include_videos: bool,
    /// Rescan `media-dir` each time the rotation queue drains.
    pub rescan_on_exhaustion: bool,
    /// Optional deterministic seed for the rotation shuffle.
    pub rotation_seed: Option<u64>,
    pub jpeg_quality: u8,
    pub geocode: GeocodeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GeocodeConfig {
    pub enabled: bool,
    /// Nominatim-compatible reverse endpoint, queried with `lat`/`lon`.
    pub endpoint: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.html_dir.as_os_str().is_empty(),
            "html-dir is required"
        );
        ensure!(
            !self.media_dir.as_os_str().is_empty(),
            "media-dir is required"
        );
        ensure!(
            self.html_dir.is_dir(),
            "html-dir {} is not a directory",
            self.html_dir.display()
        );
        ensure!(
            self.media_dir.is_dir(),
            "media-dir {} is not a directory",
            self.media_dir.display()
        );
        ensure!(
            (1..=100).contains(&self.jpeg_quality),
            "jpeg-quality must be between 1 and 100"
        );
        self.geocode
            .validate()
            .context("invalid geocode configuration")?;
        Ok(self)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            include_videos: self.include_videos,
        }
    }

    const fn default_listen_addr() -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            html_dir: PathBuf::new(),
            media_dir: PathBuf::new(),
            listen_addr: Self::default_listen_addr(),
            include_videos: false,
            rescan_on_exhaustion: true,
            rotation_seed: None,
            jpeg_quality: 95,
            geocode: GeocodeConfig::default(),
        }
    }
}

impl GeocodeConfig {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        ensure!(!self.endpoint.trim().is_empty(), "geocode.endpoint must not be empty");
        ensure!(
            self.timeout > Duration::ZERO,
            "geocode.timeout must be positive"
        );
        Ok(())
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(5),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
