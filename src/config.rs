//! Application-level configuration: loading from disk, the live [`ConfigStore`], and its
//! single update-and-persist path.

use std::{
    env, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::state::{roster::ParticipantColor, state_machine::OperatingMode};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RAFFLE_WHEEL_CONFIG_PATH";
/// Fallback color returned when the palette is empty.
const DEFAULT_COLOR: ParticipantColor = ParticipantColor {
    h: 0.0,
    s: 0.0,
    v: 1.0,
};
/// Shortest duration accepted for spins and celebrations.
const MIN_PHASE_DURATION: Duration = Duration::from_millis(50);

/// How a finished spin is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OperationMode {
    /// The operator confirms whether the winner is present.
    SemiAuto,
    /// The celebration closes by itself.
    FullAuto,
}

impl OperationMode {
    /// Operating mode a freshly loaded session starts in.
    pub fn operating_mode(self) -> OperatingMode {
        match self {
            OperationMode::SemiAuto => OperatingMode::Manual,
            OperationMode::FullAuto => OperatingMode::Auto,
        }
    }
}

/// Layout of the headless list surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListGeometry {
    /// Height of one row.
    pub row_height: f64,
    /// Vertical space between two rows.
    pub row_gap: f64,
    /// Visible height of the list.
    pub viewport_height: f64,
    /// Shift of the highlight band from the viewport middle.
    pub band_offset: f64,
}

impl Default for ListGeometry {
    fn default() -> Self {
        Self {
            row_height: 60.0,
            row_gap: 8.0,
            viewport_height: 480.0,
            band_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Runtime configuration shared across the application.
pub struct AppConfig {
    /// Duration of one spin, shared by the wheel, the list and the audio cue.
    pub spin_duration: Duration,
    /// Countdown between spins in auto mode.
    pub auto_interval: Duration,
    /// How long a full-auto celebration stays on screen.
    pub celebration_duration: Duration,
    /// How spins are confirmed.
    pub operation_mode: OperationMode,
    /// Whole wheel turns added to every spin.
    pub wheel_full_turns: u32,
    /// Full list heights scrolled past before settling.
    pub list_extra_loops: u32,
    /// Headless list layout.
    pub list_geometry: ListGeometry,
    /// Headless wheel diameter.
    pub wheel_diameter: f64,
    /// Spacing between animation frames.
    pub frame_interval: Duration,
    /// Where the history is persisted; memory only when unset.
    pub history_path: Option<PathBuf>,
    /// Whether spin and celebration sounds play.
    pub audio_enabled: bool,
    /// Sound volume in `[0, 1]`.
    pub audio_volume: f32,
    colors: Vec<ParticipantColor>,
}

impl AppConfig {
    /// Load the configuration from the resolved path, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration from `path`, falling back to built-in defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        colors = app_config.colors.len(),
                        mode = ?app_config.operation_mode,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Palette color assigned to the participant loaded at `position`.
    ///
    /// The palette cycles; an empty palette yields a neutral white.
    pub fn color_for(&self, position: usize) -> ParticipantColor {
        if self.colors.is_empty() {
            return DEFAULT_COLOR;
        }
        self.colors[position % self.colors.len()]
    }

    /// Configured palette.
    pub fn colors(&self) -> &[ParticipantColor] {
        &self.colors
    }

    /// Replace the palette.
    pub fn set_colors(&mut self, colors: Vec<ParticipantColor>) {
        self.colors = colors;
    }

    fn sanitized(mut self) -> Self {
        self.spin_duration = self.spin_duration.max(MIN_PHASE_DURATION);
        self.celebration_duration = self.celebration_duration.max(MIN_PHASE_DURATION);
        self.frame_interval = self.frame_interval.max(Duration::from_millis(1));
        self.list_extra_loops = self.list_extra_loops.max(1);
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// Errors raised while persisting configuration updates.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be encoded.
    #[error("failed to encode configuration")]
    Encode(#[from] serde_json::Error),
    /// The configuration file could not be written.
    #[error("failed to write configuration to {path}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

/// Owner of the live configuration value.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<AppConfig>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Load from the resolved path; updates are written back to it.
    pub fn load() -> Self {
        let path = resolve_config_path();
        Self {
            current: RwLock::new(AppConfig::load_from(&path)),
            path: Some(path),
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            current: RwLock::new(config.sanitized()),
            path: None,
        }
    }

    /// Copy of the current configuration.
    pub async fn snapshot(&self) -> AppConfig {
        self.current.read().await.clone()
    }

    /// Apply `change`, persist the result, then make it current.
    ///
    /// The in-memory value only changes once the write succeeded.
    pub async fn update<F>(&self, change: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        change(&mut next);
        let next = next.sanitized();

        if let Some(path) = &self.path {
            let raw = RawConfig::from(&next);
            let encoded = serde_json::to_string_pretty(&raw)?;
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| ConfigError::Write {
                        path: path.clone(),
                        source,
                    })?;
            }
            tokio::fs::write(path, encoded)
                .await
                .map_err(|source| ConfigError::Write {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), "configuration persisted");
        }

        *guard = next.clone();
        Ok(next)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    spin_duration_secs: f64,
    auto_interval_secs: f64,
    celebration_duration_secs: f64,
    operation_mode: OperationMode,
    wheel_full_turns: u32,
    list_extra_loops: u32,
    list_geometry: ListGeometry,
    wheel_diameter: f64,
    frame_interval_ms: u64,
    history_path: Option<PathBuf>,
    audio_enabled: bool,
    audio_volume: f32,
    colors: Vec<RawColor>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            spin_duration_secs: 5.0,
            auto_interval_secs: 3.0,
            celebration_duration_secs: 5.0,
            operation_mode: OperationMode::FullAuto,
            wheel_full_turns: 6,
            list_extra_loops: 3,
            list_geometry: ListGeometry::default(),
            wheel_diameter: 480.0,
            frame_interval_ms: 16,
            history_path: Some(PathBuf::from("data/history.json")),
            audio_enabled: true,
            audio_volume: 0.7,
            colors: default_colors().into_iter().map(RawColor::from).collect(),
        }
    }
}

fn secs(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .or_else(|_| Duration::try_from_secs_f64(fallback))
        .unwrap_or_default()
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = RawConfig {
            colors: Vec::new(),
            ..RawConfig::default()
        };
        Self {
            spin_duration: secs(value.spin_duration_secs, defaults.spin_duration_secs),
            auto_interval: secs(value.auto_interval_secs, defaults.auto_interval_secs),
            celebration_duration: secs(
                value.celebration_duration_secs,
                defaults.celebration_duration_secs,
            ),
            operation_mode: value.operation_mode,
            wheel_full_turns: value.wheel_full_turns,
            list_extra_loops: value.list_extra_loops,
            list_geometry: value.list_geometry,
            wheel_diameter: value.wheel_diameter,
            frame_interval: Duration::from_millis(value.frame_interval_ms),
            history_path: value.history_path,
            audio_enabled: value.audio_enabled,
            audio_volume: value.audio_volume.clamp(0.0, 1.0),
            colors: value.colors.into_iter().map(Into::into).collect(),
        }
        .sanitized()
    }
}

impl From<&AppConfig> for RawConfig {
    fn from(value: &AppConfig) -> Self {
        Self {
            spin_duration_secs: value.spin_duration.as_secs_f64(),
            auto_interval_secs: value.auto_interval.as_secs_f64(),
            celebration_duration_secs: value.celebration_duration.as_secs_f64(),
            operation_mode: value.operation_mode,
            wheel_full_turns: value.wheel_full_turns,
            list_extra_loops: value.list_extra_loops,
            list_geometry: value.list_geometry,
            wheel_diameter: value.wheel_diameter,
            frame_interval_ms: value.frame_interval.as_millis() as u64,
            history_path: value.history_path.clone(),
            audio_enabled: value.audio_enabled,
            audio_volume: value.audio_volume,
            colors: value.colors.iter().copied().map(RawColor::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// JSON representation of a single HSV entry inside the configuration file.
struct RawColor {
    hue: f32,
    saturation: f32,
    value: f32,
}

impl From<RawColor> for ParticipantColor {
    fn from(value: RawColor) -> Self {
        Self {
            h: value.hue,
            s: value.saturation,
            v: value.value,
        }
    }
}

impl From<ParticipantColor> for RawColor {
    fn from(value: ParticipantColor) -> Self {
        Self {
            hue: value.h,
            saturation: value.s,
            value: value.v,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in palette shipped with the binary.
fn default_colors() -> Vec<ParticipantColor> {
    [
        (4.0, 0.85, 0.95),
        (28.0, 0.9, 1.0),
        (48.0, 0.9, 1.0),
        (96.0, 0.7, 0.85),
        (142.0, 0.75, 0.8),
        (174.0, 0.8, 0.85),
        (198.0, 0.85, 0.95),
        (222.0, 0.75, 0.95),
        (258.0, 0.6, 0.9),
        (286.0, 0.65, 0.9),
        (318.0, 0.7, 0.95),
        (340.0, 0.8, 0.95),
    ]
    .into_iter()
    .map(|(h, s, v)| ParticipantColor { h, s, v })
    .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "spin_duration_secs": 2.5, "operation_mode": "semi-auto" }"#)
                .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.spin_duration, Duration::from_millis(2500));
        assert_eq!(config.operation_mode, OperationMode::SemiAuto);
        assert_eq!(config.auto_interval, Duration::from_secs(3));
        assert_eq!(config.wheel_full_turns, 6);
        assert_eq!(config.list_extra_loops, 3);
        assert!(config.audio_enabled);
        assert!(!config.colors().is_empty());
    }

    #[test]
    fn invalid_durations_fall_back_or_get_floored() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "spin_duration_secs": -1.0, "celebration_duration_secs": 0.0 }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.spin_duration, Duration::from_secs(5));
        assert_eq!(config.celebration_duration, MIN_PHASE_DURATION);
    }

    #[test]
    fn palette_cycles() {
        let mut config = AppConfig::default();
        let palette = config.colors().to_vec();
        assert_eq!(config.color_for(palette.len() + 1), palette[1]);

        config.set_colors(Vec::new());
        assert_eq!(config.color_for(3), DEFAULT_COLOR);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = env::temp_dir().join(format!("raffle-config-{}.json", Uuid::new_v4()));
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[tokio::test]
    async fn update_persists_and_reloads() {
        let dir = env::temp_dir().join(format!("raffle-config-{}", Uuid::new_v4()));
        let path = dir.join("app.json");
        let store = ConfigStore {
            current: RwLock::new(AppConfig::default()),
            path: Some(path.clone()),
        };

        let updated = store
            .update(|config| {
                config.operation_mode = OperationMode::SemiAuto;
                config.auto_interval = Duration::from_secs(7);
            })
            .await
            .unwrap();
        assert_eq!(updated.operation_mode, OperationMode::SemiAuto);

        let reloaded = AppConfig::load_from(&path);
        assert_eq!(reloaded.operation_mode, OperationMode::SemiAuto);
        assert_eq!(reloaded.auto_interval, Duration::from_secs(7));
        assert_eq!(store.snapshot().await, reloaded);

        let _ = fs::remove_dir_all(dir);
    }
}
