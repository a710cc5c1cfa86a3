use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::geometry::{Color, Preview, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "docsigner";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_HIGHLIGHT_OPACITY: f32 = 0.5;
const DEFAULT_UNDERLINE_THICKNESS: f64 = 2.0;
const DEFAULT_COMMENT_FONT_SIZE: f64 = 12.0;
const DEFAULT_PREVIEW_WIDTH: f64 = 300.0;
const DEFAULT_PREVIEW_HEIGHT: f64 = 200.0;
const DEFAULT_SIGNATURE_PAD_WIDTH: u32 = 500;
const DEFAULT_SIGNATURE_PAD_HEIGHT: u32 = 200;
const DEFAULT_SIGNATURE_STROKE_WIDTH: f32 = 3.0;

/// Settings from `config.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_color: Color,
    pub highlight_opacity: f32,
    pub underline_thickness: f64,
    pub comment_font_size: f64,
    pub preview_width: f64,
    pub preview_height: f64,
    pub signature_pad_width: u32,
    pub signature_pad_height: u32,
    pub signature_stroke_width: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_color: Color::GOLD,
            highlight_opacity: DEFAULT_HIGHLIGHT_OPACITY,
            underline_thickness: DEFAULT_UNDERLINE_THICKNESS,
            comment_font_size: DEFAULT_COMMENT_FONT_SIZE,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            signature_pad_width: DEFAULT_SIGNATURE_PAD_WIDTH,
            signature_pad_height: DEFAULT_SIGNATURE_PAD_HEIGHT,
            signature_stroke_width: DEFAULT_SIGNATURE_STROKE_WIDTH,
        }
    }
}

impl AppConfig {
    pub fn preview_size(&self) -> Size<Preview> {
        Size::new(self.preview_width, self.preview_height)
    }

    /// Pulls out-of-range values back to something drawable.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.highlight_opacity = if self.highlight_opacity.is_finite() {
            self.highlight_opacity.clamp(0.0, 1.0)
        } else {
            defaults.highlight_opacity
        };
        self.underline_thickness =
            positive_or(self.underline_thickness, defaults.underline_thickness).min(72.0);
        self.comment_font_size =
            positive_or(self.comment_font_size, defaults.comment_font_size).clamp(4.0, 144.0);
        self.preview_width = positive_or(self.preview_width, defaults.preview_width);
        self.preview_height = positive_or(self.preview_height, defaults.preview_height);
        self.signature_pad_width = self.signature_pad_width.clamp(16, 4096);
        self.signature_pad_height = self.signature_pad_height.clamp(16, 4096);
        self.signature_stroke_width = if self.signature_stroke_width.is_finite() {
            self.signature_stroke_width.clamp(0.5, 32.0)
        } else {
            defaults.signature_stroke_width
        };
        self
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

pub fn load_app_config() -> AppConfig {
    let xdg_config_home = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

pub(crate) fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let Ok(path) = config_file_path(xdg_config_home, home) else {
        tracing::debug!("no config directory available; using defaults");
        return AppConfig::default();
    };
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(err) => {
            tracing::warn!(?err, path = %path.display(), "config.json unreadable; using defaults");
            return AppConfig::default();
        }
    };
    parse_app_config(&contents).unwrap_or_else(|err| {
        tracing::warn!(%err, path = %path.display(), "config.json invalid; using defaults");
        AppConfig::default()
    })
}

pub(crate) fn parse_app_config(contents: &str) -> serde_json::Result<AppConfig> {
    serde_json::from_str::<AppConfig>(contents).map(AppConfig::sanitized)
}

/// `$XDG_CONFIG_HOME/docsigner/config.json`, or `~/.config/docsigner/config.json`
/// when XDG_CONFIG_HOME is unset or empty.
pub(crate) fn config_file_path(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let root = match xdg_config_home.filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => home
            .map(|home| home.join(".config"))
            .ok_or(ConfigPathError::MissingHomeDirectory)?,
    };
    Ok(root.join(APP_DIR).join(APP_CONFIG_FILE))
}
