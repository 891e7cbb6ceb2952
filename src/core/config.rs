//! Persistent settings for santa.
//!
//! Stored at `~/.config/santa/config.toml` (Linux) or
//! `~/Library/Application Support/santa/config.toml` (macOS).
//!
//! Values can also be set via environment variables (higher priority):
//! `draw.max_attempts` is read from `SANTA_DRAW_MAX_ATTEMPTS`.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::draw;

pub const DEFAULT_SHARE_BASE_URL: &str = "https://secret-santa.example/";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Keys `santa config set` accepts.
pub const KNOWN_KEYS: &[&str] = &["draw.max_attempts", "share.base_url", "log.level"];

/// Get the santa config directory. `SANTA_CONFIG_DIR` overrides it.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SANTA_CONFIG_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("santa")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// "draw.max_attempts" → "SANTA_DRAW_MAX_ATTEMPTS"
fn env_key(key: &str) -> String {
    format!("SANTA_{}", key.replace('.', "_").to_uppercase())
}

/// Read a config value. Env var first, then the config file.
pub fn get(key: &str) -> Option<String> {
    if let Ok(val) = std::env::var(env_key(key)) {
        if !val.is_empty() {
            return Some(val);
        }
    }
    load_config().unwrap_or_default().remove(key)
}

/// Set a config value in the config file.
pub fn set(key: &str, value: &str) -> Result<()> {
    validate(key, value)?;
    let mut config = load_config()?;
    config.insert(key.to_string(), value.to_string());
    save_config(&config)
}

/// Remove a config value from the config file.
pub fn unset(key: &str) -> Result<()> {
    let mut config = load_config()?;
    config.remove(key);
    save_config(&config)
}

/// List all values stored in the config file.
pub fn list() -> BTreeMap<String, String> {
    load_config().unwrap_or_default()
}

/// Attempt budget for a draw, clamped to a sane range.
pub fn max_attempts() -> u32 {
    let raw = get("draw.max_attempts");
    let parsed = raw.as_deref().map(str::parse::<u32>);
    match parsed {
        Some(Ok(n)) => draw::clamp_attempts(n),
        Some(Err(_)) => {
            tracing::warn!(value = ?raw, "ignoring invalid draw.max_attempts");
            draw::DEFAULT_MAX_ATTEMPTS
        }
        None => draw::DEFAULT_MAX_ATTEMPTS,
    }
}

/// Base URL share links are built on.
pub fn share_base_url() -> String {
    get("share.base_url").unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.to_string())
}

pub fn log_level() -> String {
    get("log.level").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn validate(key: &str, value: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!("unknown config key '{}' (known: {})", key, KNOWN_KEYS.join(", "));
    }
    match key {
        "draw.max_attempts" => {
            let n: u32 = value
                .parse()
                .with_context(|| format!("'{}' is not a whole number", value))?;
            if n == 0 || n > draw::MAX_ATTEMPTS_CEILING {
                bail!(
                    "draw.max_attempts must be between 1 and {}",
                    draw::MAX_ATTEMPTS_CEILING
                );
            }
        }
        "share.base_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                bail!("share.base_url must start with http:// or https://");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Load config from file. Simple `key = "value"` lines; `[section]` headers
/// prefix the keys that follow them. Lines starting with # are comments.
fn load_config() -> Result<BTreeMap<String, String>> {
    let path = config_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(parse_config(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn parse_config(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            let full_key = if section.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", section, key)
            };
            map.insert(full_key, value.to_string());
        }
    }

    map
}

fn render_config(config: &BTreeMap<String, String>) -> String {
    let mut sections: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for (key, value) in config {
        let (section, field) = key.split_once('.').unwrap_or(("", key.as_str()));
        sections
            .entry(section)
            .or_default()
            .push((field, value.as_str()));
    }

    let mut output = String::new();
    // Top-level keys first; "" sorts before any section name
    for (name, fields) in &sections {
        if !name.is_empty() {
            output.push_str(&format!("[{}]\n", name));
        }
        for (k, v) in fields {
            output.push_str(&format!("{} = \"{}\"\n", k, v));
        }
        output.push('\n');
    }
    output
}

fn save_config(config: &BTreeMap<String, String>) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = config_path();
    std::fs::write(&path, render_config(config))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
