use super::{load_config, user_config_path, workspace_config_path};
use crate::test_utils::{env_lock, EnvVarGuard};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config dir");
    }
    fs::write(path, contents).expect("write config");
}

struct IsolatedEnv {
    home: TempDir,
    config_home: TempDir,
    _guards: Vec<EnvVarGuard>,
}

fn isolated_env() -> IsolatedEnv {
    let home = TempDir::new().expect("temp home");
    let config_home = TempDir::new().expect("temp config");
    let guards = vec![
        EnvVarGuard::set("HOME", home.path().display().to_string()),
        EnvVarGuard::set("XDG_CONFIG_HOME", config_home.path().display().to_string()),
        EnvVarGuard::set("SHELL", "/bin/zsh".to_string()),
        EnvVarGuard::remove("PAIRTERM_API_KEY"),
    ];
    IsolatedEnv {
        home,
        config_home,
        _guards: guards,
    }
}

#[test]
fn load_config_uses_defaults_when_empty() {
    let _lock = env_lock();
    let env = isolated_env();

    let repo = TempDir::new().expect("temp repo");
    let config = load_config(repo.path());

    assert_eq!(config.terminal.shell, "/bin/zsh");
    assert!(config.terminal.args.is_empty());
    assert_eq!(config.model.base_url, "https://echo.router.merit.systems");
    assert_eq!(config.model.model, "gpt-4.1");
    assert_eq!(config.model.timeout, Duration::from_secs(120));
    assert_eq!(config.model.max_tool_rounds, 16);
    assert_eq!(config.model.api_key, None);
    assert_eq!(config.history.capacity, 100);
    assert_eq!(config.history.quiescence, Duration::from_millis(1000));
    assert_eq!(config.keymap.toggle_focus, "shift+tab");
    assert_eq!(config.keymap.quit, "ctrl+q");
    assert!(!config.logging.enabled);
    assert_eq!(config.logging.level, "info");
    assert_eq!(
        config.logging.dir,
        env.home.path().join(".pairterm").join("logs")
    );
    assert!(config.warnings.is_empty());
}

#[test]
fn load_config_merges_user_and_workspace() {
    let _lock = env_lock();
    let env = isolated_env();

    write_config(
        &env.config_home.path().join("pairterm").join("config.toml"),
        r#"
[terminal]
shell = "bash"
args = ["-l"]

[model]
model = "gpt-4.1-mini"
timeoutSecs = 30
api_key = "user-key"

[history]
capacity = 50

[keymap]
toggle_focus = "ctrl+t"
quit = "ctrl+x"

[logging]
enabled = true
dir = "~/pairterm-logs"
"#,
    );

    let repo = TempDir::new().expect("temp repo");
    write_config(
        &workspace_config_path(repo.path()),
        r#"
[terminal]
shell = "fish"

[model]
baseUrl = "http://localhost:8080/v1"

[history]
quiescence_ms = 250

[keymap]
quit = "ctrl+d"
"#,
    );

    let config = load_config(repo.path());

    assert_eq!(config.terminal.shell, "fish");
    assert_eq!(config.terminal.args, vec!["-l".to_string()]);
    assert_eq!(config.model.base_url, "http://localhost:8080/v1");
    assert_eq!(config.model.model, "gpt-4.1-mini");
    assert_eq!(config.model.timeout, Duration::from_secs(30));
    assert_eq!(config.model.api_key.as_deref(), Some("user-key"));
    assert_eq!(config.history.capacity, 50);
    assert_eq!(config.history.quiescence, Duration::from_millis(250));
    assert_eq!(config.keymap.toggle_focus, "ctrl+t");
    assert_eq!(config.keymap.quit, "ctrl+d");
    assert!(config.logging.enabled);
    assert_eq!(config.logging.dir, env.home.path().join("pairterm-logs"));
}

#[test]
fn api_key_env_var_wins_over_config() {
    let _lock = env_lock();
    let env = isolated_env();
    let _key = EnvVarGuard::set("PAIRTERM_API_KEY", "env-key".to_string());
    write_config(
        &env.config_home.path().join("pairterm").join("config.toml"),
        "[model]\napi_key = \"file-key\"\n",
    );

    let repo = TempDir::new().expect("temp repo");
    let config = load_config(repo.path());
    assert_eq!(config.model.api_key.as_deref(), Some("env-key"));
}

#[test]
fn unparsable_file_is_reported_and_skipped() {
    let _lock = env_lock();
    let _env = isolated_env();

    let repo = TempDir::new().expect("temp repo");
    write_config(
        &workspace_config_path(repo.path()),
        "[model\nmodel = \"broken\"\n",
    );

    let config = load_config(repo.path());
    assert_eq!(config.model.model, "gpt-4.1");
    assert_eq!(config.warnings.len(), 1);
    assert!(config.warnings[0].starts_with("failed to parse"));
}

#[test]
fn user_config_path_prefers_xdg() {
    let _lock = env_lock();
    let env = isolated_env();
    assert_eq!(
        user_config_path(),
        Some(env.config_home.path().join("pairterm").join("config.toml"))
    );

    let _unset = EnvVarGuard::remove("XDG_CONFIG_HOME");
    assert_eq!(
        user_config_path(),
        Some(env.home.path().join(".config").join("pairterm").join("config.toml"))
    );
}
