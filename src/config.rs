//! Viewer configuration: an optional JSON file overlaid with CLI flags.

use crate::channel::{Transport, TransportKind, DEFAULT_PORT};
use crate::render::{OrbitSettings, Viewport};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid camera limits: min distance {min} exceeds max distance {max}")]
    CameraLimits { min: f32, max: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub asset: PathBuf,
    pub transport: TransportKind,
    pub port: u16,
    /// Print a JSON state snapshot to stdout after every change.
    pub print_state: bool,
    pub interaction_enabled: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub camera_min_distance: f32,
    pub camera_max_distance: f32,
    pub camera_damping: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let orbit = OrbitSettings::default();
        Self {
            asset: PathBuf::from("assets/shoe.glb"),
            transport: TransportKind::Stdin,
            port: DEFAULT_PORT,
            print_state: false,
            interaction_enabled: true,
            viewport_width: 1280,
            viewport_height: 720,
            camera_min_distance: orbit.min_distance,
            camera_max_distance: orbit.max_distance,
            camera_damping: orbit.damping,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera_min_distance > self.camera_max_distance {
            return Err(ConfigError::CameraLimits {
                min: self.camera_min_distance,
                max: self.camera_max_distance,
            });
        }
        Ok(())
    }

    pub fn transport(&self) -> Transport {
        Transport::from_kind(self.transport, self.port)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn orbit_settings(&self) -> OrbitSettings {
        OrbitSettings {
            min_distance: self.camera_min_distance,
            max_distance: self.camera_max_distance,
            damping: self.camera_damping,
            ..OrbitSettings::default()
        }
    }
}

/// Shoe customizer view - headless host for part customization
#[derive(Debug, Parser)]
#[command(name = "shoe-customizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// glTF/GLB shoe model to load
    #[arg(short, long)]
    pub asset: Option<PathBuf>,

    /// JSON config file (CLI flags take precedence)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host channel transport
    #[arg(long, value_parser = ["stdin", "websocket"])]
    pub transport: Option<String>,

    /// WebSocket port (default: 9240)
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the customization state as JSON after every change
    #[arg(long)]
    pub print_state: bool,

    /// Start with part selection disabled
    #[arg(long)]
    pub no_interaction: bool,

    /// Log filter, e.g. "debug" or "shoe_customizer=trace"
    #[arg(long)]
    pub log: Option<String>,
}

impl Cli {
    /// Loads the config file if one was given and applies the flags on top.
    pub fn resolve(&self) -> Result<ViewerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if let Some(asset) = &self.asset {
            config.asset = asset.clone();
        }
        match self.transport.as_deref() {
            Some("websocket") => config.transport = TransportKind::Websocket,
            Some("stdin") => config.transport = TransportKind::Stdin,
            _ => {}
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        config.print_state |= self.print_state;
        if self.no_interaction {
            config.interaction_enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}
