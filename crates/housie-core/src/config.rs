// Configuration loading and parsing (housie.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::protocol::{GameId, RoundId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundPathError {
    #[error("base URL {0} cannot carry a path")]
    CannotBeABase(String),

    #[error("id {0:?} does not make a usable path segment")]
    BadSegment(String),
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub notifications: NotificationsConfig,
    /// Directory the files were read from. `credentials.toml` is not part of
    /// the loaded config; the credential provider reads it from here.
    pub config_dir: PathBuf,
}

impl Config {
    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }
}

// ---------------------------------------------------------------------------
// housie.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct HousieFile {
    server: ServerConfig,
    #[serde(default)]
    notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the HTTP API, e.g. `https://housie.example.com`.
    pub api_base_url: String,
    /// Base URL of the WebSocket endpoint. Derived from `api_base_url` when
    /// omitted.
    #[serde(default)]
    pub ws_base_url: Option<String>,
    #[serde(default = "default_bootstrap_path")]
    pub bootstrap_path: String,
    #[serde(default = "default_channel_path")]
    pub channel_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl ServerConfig {
    /// Defaults for everything but the API base.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        ServerConfig {
            api_base_url: api_base_url.into(),
            ws_base_url: None,
            bootstrap_path: default_bootstrap_path(),
            channel_path: default_channel_path(),
            request_timeout_secs: default_request_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

fn default_bootstrap_path() -> String {
    "/api/games/{game_id}/rounds/{round_id}/".into()
}

fn default_channel_path() -> String {
    "/ws/game/{game_id}/round/{round_id}/".into()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds a toast or winner modal stays on screen.
    #[serde(default = "default_display_secs")]
    pub display_secs: u64,
}

impl NotificationsConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_secs(self.display_secs)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        NotificationsConfig {
            display_secs: default_display_secs(),
        }
    }
}

fn default_display_secs() -> u64 {
    5
}

/// Build the URL of one round: `template`'s path on `base`'s origin, with
/// `{game_id}` and `{round_id}` filled in.
///
/// Ids are percent-encoded as segment text, so `/`, `?` or `#` inside an id
/// cannot change the request target. A filled segment that comes out empty,
/// `.` or `..` is refused.
pub fn round_url(
    base: &Url,
    template: &str,
    game_id: &GameId,
    round_id: &RoundId,
) -> Result<Url, RoundPathError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| RoundPathError::CannotBeABase(base.to_string()))?;
        segments.clear();
        for raw in template.trim_start_matches('/').split('/') {
            let filled = raw
                .replace("{game_id}", game_id.as_str())
                .replace("{round_id}", round_id.as_str());
            if filled != raw && matches!(filled.as_str(), "" | "." | "..") {
                return Err(RoundPathError::BadSegment(filled));
            }
            segments.push(&filled);
        }
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `housie.toml` from `config/` under `base_dir`. Does not
/// copy defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    load_from_config_dir(&base_dir.join("config"))
}

fn load_from_config_dir(config_dir: &Path) -> Result<Config, ConfigError> {
    // --- housie.toml (required) ---
    let housie_path = config_dir.join("housie.toml");
    let housie_text = read_file(&housie_path)?;
    let housie_file: HousieFile =
        toml::from_str(&housie_text).map_err(|e| ConfigError::ParseError {
            path: housie_path.clone(),
            source: e,
        })?;

    let config = Config {
        server: housie_file.server,
        notifications: housie_file.notifications,
        config_dir: config_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config-dir",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config from `explicit_dir` if given, else from the working
/// directory, else from the platform config directory.
///
/// `explicit_dir` and the working directory are project roots holding
/// `defaults/` and `config/`; missing config files are copied from
/// `defaults/` first. The platform directory holds the files directly.
pub fn load_config(explicit_dir: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(dir) = explicit_dir {
        ensure_config_files(dir)?;
        return load_config_from(dir);
    }

    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        ensure_config_files(&cwd)?;
        return load_config_from(&cwd);
    }

    match ProjectDirs::from("", "", "housie") {
        Some(dirs) => {
            info!("Using platform config directory {}", dirs.config_dir().display());
            load_from_config_dir(dirs.config_dir())
        }
        None => Err(ConfigError::FileNotFound {
            path: cwd.join("config").join("housie.toml"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;

    validate_url("server.api_base_url", &server.api_base_url, &["http", "https"])?;
    if let Some(ws) = &server.ws_base_url {
        validate_url("server.ws_base_url", ws, &["ws", "wss"])?;
    }

    let templates: &[(&str, &str)] = &[
        ("server.bootstrap_path", &server.bootstrap_path),
        ("server.channel_path", &server.channel_path),
    ];
    for (name, template) in templates {
        for placeholder in ["{game_id}", "{round_id}"] {
            if !template.contains(placeholder) {
                return Err(ConfigError::ValidationError {
                    field: name.to_string(),
                    message: format!("must contain {placeholder}"),
                });
            }
        }
    }

    let durations: &[(&str, u64)] = &[
        ("server.request_timeout_secs", server.request_timeout_secs),
        ("server.handshake_timeout_secs", server.handshake_timeout_secs),
        ("notifications.display_secs", config.notifications.display_secs),
    ];
    for (name, val) in durations {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

fn validate_url(field: &str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: "must not be empty".into(),
        });
    }
    let url = Url::parse(value).map_err(|e| ConfigError::ValidationError {
        field: field.into(),
        message: format!("not a valid URL: {e}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: format!("scheme must be one of {}, got {}", schemes.join("/"), url.scheme()),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialProvider, FileCredentials};
    use std::fs;

    /// Repository root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    /// Fresh temp dir with `config/housie.toml` containing `housie_toml`.
    fn config_with(name: &str, housie_toml: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/housie.toml"), housie_toml).unwrap();
        tmp
    }

    fn expect_validation_error(result: Result<Config, ConfigError>, expected_field: &str) {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, expected_field),
            Err(other) => panic!("expected ValidationError, got: {other}"),
            Ok(_) => panic!("expected ValidationError, got Ok"),
        }
    }

    #[test]
    fn load_valid_config_from_shipped_defaults() {
        let tmp = std::env::temp_dir().join("housie_config_shipped_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/housie.toml"),
            tmp.join("config/housie.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("shipped defaults should load");
        assert_eq!(config.server.handshake_timeout_secs, 10);
        assert_eq!(config.server.request_timeout_secs, 15);
        assert_eq!(config.notifications.display_secs, 5);
        assert!(config.server.channel_path.contains("{round_id}"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let tmp = config_with(
            "housie_config_minimal",
            "[server]\napi_base_url = \"http://localhost:8000\"\n",
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.server.ws_base_url, None);
        assert_eq!(
            config.server.bootstrap_path,
            "/api/games/{game_id}/rounds/{round_id}/"
        );
        assert_eq!(config.notifications.display_duration(), Duration::from_secs(5));
        assert_eq!(config.credentials_path(), tmp.join("config/credentials.toml"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_credentials_do_not_block_startup() {
        let tmp = config_with(
            "housie_config_bad_credentials",
            "[server]\napi_base_url = \"https://api.example.com\"\n",
        );
        fs::write(tmp.join("config/credentials.toml"), "auth_token = [not toml").unwrap();

        let config = load_config_from(&tmp).expect("credentials are not part of startup config");
        let provider = FileCredentials::new(config.credentials_path());
        assert_eq!(provider.auth_token(), None);

        fs::write(
            tmp.join("config/credentials.toml"),
            "auth_token = \"abc\"\nplayer_id = \"7\"\n",
        )
        .unwrap();
        assert_eq!(provider.auth_token().as_deref(), Some("abc"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_bad_api_scheme() {
        let tmp = config_with(
            "housie_config_bad_scheme",
            "[server]\napi_base_url = \"ftp://api.example.com\"\n",
        );
        expect_validation_error(load_config_from(&tmp), "server.api_base_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_api_url() {
        let tmp = config_with("housie_config_empty_url", "[server]\napi_base_url = \"\"\n");
        expect_validation_error(load_config_from(&tmp), "server.api_base_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_http_ws_base() {
        let tmp = config_with(
            "housie_config_bad_ws",
            "[server]\napi_base_url = \"https://a.example.com\"\nws_base_url = \"https://a.example.com\"\n",
        );
        expect_validation_error(load_config_from(&tmp), "server.ws_base_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_template_without_round_placeholder() {
        let tmp = config_with(
            "housie_config_bad_template",
            "[server]\napi_base_url = \"https://a.example.com\"\nchannel_path = \"/ws/game/{game_id}/\"\n",
        );
        expect_validation_error(load_config_from(&tmp), "server.channel_path");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_display_secs() {
        let tmp = config_with(
            "housie_config_zero_display",
            "[server]\napi_base_url = \"https://a.example.com\"\n[notifications]\ndisplay_secs = 0\n",
        );
        expect_validation_error(load_config_from(&tmp), "notifications.display_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_handshake_timeout() {
        let tmp = config_with(
            "housie_config_zero_handshake",
            "[server]\napi_base_url = \"https://a.example.com\"\nhandshake_timeout_secs = 0\n",
        );
        expect_validation_error(load_config_from(&tmp), "server.handshake_timeout_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_housie_toml() {
        let tmp = std::env::temp_dir().join("housie_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("housie.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = config_with("housie_config_invalid_toml", "this is not valid [[[ toml");
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("housie.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("housie_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        fs::copy(
            project_root().join("defaults/housie.toml"),
            defaults_dir.join("housie.toml"),
        )
        .unwrap();
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "auth_token = \"...\"\n",
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/housie.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run copies nothing and keeps edits.
        fs::write(tmp.join("config/housie.toml"), "# custom\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/housie.toml")).unwrap(),
            "# custom\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("housie_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_dir_is_initialized_from_defaults() {
        let tmp = std::env::temp_dir().join("housie_config_explicit_dir");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/housie.toml"),
            tmp.join("defaults/housie.toml"),
        )
        .unwrap();

        let config = load_config(Some(&tmp)).unwrap();
        assert_eq!(config.config_dir, tmp.join("config"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn round_url_fills_both_ids() {
        let base = Url::parse("https://api.example.com/ignored/prefix").unwrap();
        let url = round_url(
            &base,
            "/api/games/{game_id}/rounds/{round_id}/",
            &GameId::new("4"),
            &RoundId::new("11"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/games/4/rounds/11/");
    }

    #[test]
    fn round_url_escapes_ids() {
        let base = Url::parse("https://api.example.com").unwrap();
        let url = round_url(
            &base,
            "/api/games/{game_id}/rounds/{round_id}/",
            &GameId::new("4/../../admin"),
            &RoundId::new("11?x=1#frag"),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/games/4%2F..%2F..%2Fadmin/rounds/11%3Fx=1%23frag/"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn round_url_refuses_dot_segments() {
        let base = Url::parse("https://api.example.com").unwrap();
        for id in ["..", ".", ""] {
            assert_eq!(
                round_url(
                    &base,
                    "/api/games/{game_id}/rounds/{round_id}/",
                    &GameId::new(id),
                    &RoundId::new("1"),
                ),
                Err(RoundPathError::BadSegment(id.to_string()))
            );
        }
    }
}
