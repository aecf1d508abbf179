use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::azure::{vote, Run, RunState};

pub const ORG_URL_VAR: &str = "AZURE_ORG_URL";
pub const PAT_VAR: &str = "AZURE_PAT";

/// Azure DevOps credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub azure_org_url: String,
    pub azure_pat: String,
}

impl Config {
    /// ~/.config/aztui/config.json
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("aztui").join("config.json"))
    }

    /// Load from the config file, then `.env`, then the process environment
    pub fn load() -> Self {
        let env_files = [PathBuf::from(".env"), Path::new("..").join(".env")];
        let config_path = Self::path();
        Self::load_with(config_path.as_deref(), &env_files, |key| {
            std::env::var(key).ok()
        })
    }

    pub fn load_with(
        config_path: Option<&Path>,
        env_files: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = config_path
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|contents| serde_json::from_str::<Config>(&contents).ok())
            .unwrap_or_default();

        if config.is_complete() {
            return config;
        }

        // First readable dotenv file; malformed lines are skipped
        let dotenv = env_files
            .iter()
            .find_map(|path| dotenvy::from_path_iter(path).ok())
            .map(|iter| {
                iter.filter_map(|item| item.ok())
                    .filter(|(_, value)| !value.is_empty())
                    .collect::<Vec<(String, String)>>()
            });
        if let Some(vars) = dotenv {
            config.fill_from(|key| {
                vars.iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
            });
        }

        config.fill_from(env);
        config
    }

    fn fill_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.azure_org_url.trim().is_empty() {
            if let Some(value) = lookup(ORG_URL_VAR) {
                self.azure_org_url = value;
            }
        }
        if self.azure_pat.trim().is_empty() {
            if let Some(value) = lookup(PAT_VAR) {
                self.azure_pat = value;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.azure_org_url.trim().is_empty() && !self.azure_pat.trim().is_empty()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path().context("Could not determine home directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        write_private(path, data.as_bytes())
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}

/// Colors used by the renderer
#[derive(Debug, Clone)]
pub struct Theme {
    pub border: String,
    pub border_active: String,
    pub selected_bg: String,
    pub text: String,
    pub text_muted: String,
    pub highlight: String,
    pub success: String,
    pub failure: String,
    pub warning: String,
    pub running: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // One Dark color scheme
            border: "#5c6370".to_string(),
            border_active: "#61afef".to_string(),
            selected_bg: "#2c323c".to_string(),
            text: "#abb2bf".to_string(),
            text_muted: "#5c6370".to_string(),
            highlight: "#61afef".to_string(),
            success: "#98c379".to_string(),
            failure: "#e06c75".to_string(),
            warning: "#e5c07b".to_string(),
            running: "#56b6c2".to_string(),
        }
    }
}

impl Theme {
    pub fn parse_color(&self, hex: &str) -> Color {
        if hex.starts_with('#') && hex.len() == 7 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[1..3], 16),
                u8::from_str_radix(&hex[3..5], 16),
                u8::from_str_radix(&hex[5..7], 16),
            ) {
                return Color::Rgb(r, g, b);
            }
        }
        Color::White
    }

    /// Color for a build/timeline result string
    pub fn result_color(&self, result: Option<&str>) -> Color {
        match result {
            Some("succeeded") => self.parse_color(&self.success),
            Some("failed") => self.parse_color(&self.failure),
            Some("succeededWithIssues") | Some("partiallySucceeded") => {
                self.parse_color(&self.warning)
            }
            Some("canceled") | Some("skipped") => self.parse_color(&self.text_muted),
            _ => self.parse_color(&self.text),
        }
    }

    pub fn run_color(&self, run: &Run) -> Color {
        match run.state {
            RunState::InProgress => self.parse_color(&self.running),
            RunState::NotStarted | RunState::Canceling => self.parse_color(&self.warning),
            RunState::Completed => self.result_color(run.result.as_deref()),
            RunState::Unknown => self.parse_color(&self.text_muted),
        }
    }

    pub fn record_color(&self, state: Option<&str>, result: Option<&str>) -> Color {
        match state {
            Some("inProgress") => self.parse_color(&self.running),
            Some("pending") => self.parse_color(&self.text_muted),
            _ => self.result_color(result),
        }
    }

    pub fn vote_color(&self, vote: i32) -> Color {
        match vote {
            vote::APPROVE | vote::APPROVE_WITH_SUGGESTIONS => self.parse_color(&self.success),
            vote::WAIT_FOR_AUTHOR => self.parse_color(&self.warning),
            vote::REJECT => self.parse_color(&self.failure),
            _ => self.parse_color(&self.text_muted),
        }
    }

    /// Action messages containing "Failed" are errors
    pub fn message_color(&self, message: &str) -> Color {
        if message.contains("Failed") {
            self.parse_color(&self.failure)
        } else {
            self.parse_color(&self.success)
        }
    }
}
