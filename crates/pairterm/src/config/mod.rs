//! Configuration loading and merging.
//!
//! Config is loaded from two sources with workspace taking precedence:
//! 1. User-level: `$XDG_CONFIG_HOME/pairterm/config.toml`
//!    (or `~/.config/pairterm/config.toml`)
//! 2. Workspace-level: `<cwd>/.pairterm/config.toml`
//!
//! Missing files give defaults. Files that fail to parse are skipped and
//! reported through `Config::warnings`, since logging is not up yet when
//! config is read.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SHELL: &str = "/bin/sh";
const DEFAULT_BASE_URL: &str = "https://echo.router.merit.systems";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 16;
const DEFAULT_HISTORY_CAPACITY: usize = 100;
const DEFAULT_QUIESCENCE_MS: u64 = 1000;
const DEFAULT_TOGGLE_FOCUS: &str = "shift+tab";
const DEFAULT_QUIT: &str = "ctrl+q";
const DEFAULT_LOG_LEVEL: &str = "info";
const API_KEY_ENV: &str = "PAIRTERM_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub terminal: TerminalConfig,
    pub model: ModelConfig,
    pub history: HistoryConfig,
    pub keymap: KeymapConfig,
    pub logging: LoggingConfig,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    pub shell: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tool_rounds: usize,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub quiescence: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeymapConfig {
    pub toggle_focus: String,
    pub quit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    pub dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    terminal: Option<RawTerminal>,
    model: Option<RawModel>,
    history: Option<RawHistory>,
    keymap: Option<RawKeymap>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTerminal {
    #[serde(alias = "command")]
    shell: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawModel {
    #[serde(alias = "baseUrl")]
    base_url: Option<String>,
    model: Option<String>,
    #[serde(alias = "timeoutSecs")]
    timeout_secs: Option<u64>,
    #[serde(alias = "maxToolRounds")]
    max_tool_rounds: Option<usize>,
    #[serde(alias = "apiKey")]
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHistory {
    capacity: Option<usize>,
    #[serde(alias = "quiescenceMs")]
    quiescence_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawKeymap {
    #[serde(alias = "toggleFocus")]
    toggle_focus: Option<String>,
    quit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    enabled: Option<bool>,
    level: Option<String>,
    dir: Option<String>,
}

fn read_toml(path: &Path) -> Result<Option<RawConfig>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    toml::from_str::<RawConfig>(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Pick the workspace value, then the user value.
fn layered<S, T>(
    user: Option<&S>,
    workspace: Option<&S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    workspace.and_then(&field).or_else(|| user.and_then(&field))
}

fn merge_config(user: Option<RawConfig>, workspace: Option<RawConfig>) -> Config {
    let user_terminal = user.as_ref().and_then(|c| c.terminal.as_ref());
    let workspace_terminal = workspace.as_ref().and_then(|c| c.terminal.as_ref());
    let shell = layered(user_terminal, workspace_terminal, |t| t.shell.clone())
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(default_shell);
    let args = layered(user_terminal, workspace_terminal, |t| t.args.clone()).unwrap_or_default();

    let user_model = user.as_ref().and_then(|c| c.model.as_ref());
    let workspace_model = workspace.as_ref().and_then(|c| c.model.as_ref());
    let base_url = layered(user_model, workspace_model, |m| m.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let model = layered(user_model, workspace_model, |m| m.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let timeout_secs = layered(user_model, workspace_model, |m| m.timeout_secs)
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let max_tool_rounds = layered(user_model, workspace_model, |m| m.max_tool_rounds)
        .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);
    let api_key = env::var(API_KEY_ENV)
        .ok()
        .or_else(|| layered(user_model, workspace_model, |m| m.api_key.clone()))
        .filter(|key| !key.trim().is_empty());

    let user_history = user.as_ref().and_then(|c| c.history.as_ref());
    let workspace_history = workspace.as_ref().and_then(|c| c.history.as_ref());
    let capacity = layered(user_history, workspace_history, |h| h.capacity)
        .filter(|capacity| *capacity > 0)
        .unwrap_or(DEFAULT_HISTORY_CAPACITY);
    let quiescence_ms = layered(user_history, workspace_history, |h| h.quiescence_ms)
        .unwrap_or(DEFAULT_QUIESCENCE_MS);

    let user_keymap = user.as_ref().and_then(|c| c.keymap.as_ref());
    let workspace_keymap = workspace.as_ref().and_then(|c| c.keymap.as_ref());
    let toggle_focus = layered(user_keymap, workspace_keymap, |k| k.toggle_focus.clone())
        .unwrap_or_else(|| DEFAULT_TOGGLE_FOCUS.to_string());
    let quit = layered(user_keymap, workspace_keymap, |k| k.quit.clone())
        .unwrap_or_else(|| DEFAULT_QUIT.to_string());

    let user_logging = user.as_ref().and_then(|c| c.logging.as_ref());
    let workspace_logging = workspace.as_ref().and_then(|c| c.logging.as_ref());
    let enabled = layered(user_logging, workspace_logging, |l| l.enabled).unwrap_or(false);
    let level = layered(user_logging, workspace_logging, |l| l.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    let dir = layered(user_logging, workspace_logging, |l| l.dir.clone())
        .map(|dir| expand_home(&dir))
        .unwrap_or_else(default_log_dir);

    Config {
        terminal: TerminalConfig { shell, args },
        model: ModelConfig {
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
            max_tool_rounds,
            api_key,
        },
        history: HistoryConfig {
            capacity,
            quiescence: Duration::from_millis(quiescence_ms),
        },
        keymap: KeymapConfig { toggle_focus, quit },
        logging: LoggingConfig { enabled, level, dir },
        warnings: Vec::new(),
    }
}

fn default_shell() -> String {
    env::var("SHELL")
        .ok()
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pairterm")
        .join("logs")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

pub fn workspace_config_path(root: &Path) -> PathBuf {
    root.join(".pairterm").join("config.toml")
}

pub fn user_config_path() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
    Some(base.join("pairterm").join("config.toml"))
}

pub fn load_config(root: &Path) -> Config {
    let mut warnings = Vec::new();
    let mut load = |path: &Path| match read_toml(path) {
        Ok(config) => config,
        Err(err) => {
            warnings.push(err.to_string());
            None
        }
    };

    let user_config = user_config_path().and_then(|path| load(&path));
    let workspace_config = load(&workspace_config_path(root));

    let mut config = merge_config(user_config, workspace_config);
    config.warnings = warnings;
    config
}

#[cfg(test)]
mod tests;
