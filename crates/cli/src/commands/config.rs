use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use storeops_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: &str| {
        lines.push(render_line(
            key,
            value,
            field_source(key, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, "STOREOPS_DATABASE_URL");
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        "STOREOPS_DATABASE_MAX_CONNECTIONS",
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        "STOREOPS_DATABASE_TIMEOUT_SECS",
    );

    push(
        "notifier.enabled",
        &config.notifier.enabled.to_string(),
        "STOREOPS_NOTIFIER_ENABLED",
    );
    push(
        "notifier.sender_mobile",
        config.notifier.sender_mobile.as_deref().unwrap_or("<unset>"),
        "STOREOPS_NOTIFIER_SENDER_MOBILE",
    );
    push(
        "notifier.instance_id",
        config.notifier.instance_id.as_deref().unwrap_or("<unset>"),
        "STOREOPS_NOTIFIER_INSTANCE_ID",
    );
    let password = match &config.notifier.password {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>",
        Some(_) => "<empty>",
        None => "<unset>",
    };
    push("notifier.password", password, "STOREOPS_NOTIFIER_PASSWORD");
    push("notifier.base_url", &config.notifier.base_url, "STOREOPS_NOTIFIER_BASE_URL");
    push(
        "notifier.timeout_secs",
        &config.notifier.timeout_secs.to_string(),
        "STOREOPS_NOTIFIER_TIMEOUT_SECS",
    );

    push("server.bind_address", &config.server.bind_address, "STOREOPS_SERVER_BIND_ADDRESS");
    push("server.api_port", &config.server.api_port.to_string(), "STOREOPS_SERVER_API_PORT");
    push(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        "STOREOPS_SERVER_HEALTH_CHECK_PORT",
    );
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        "STOREOPS_SERVER_GRACEFUL_SHUTDOWN_SECS",
    );

    push("logging.level", &config.logging.level, "STOREOPS_LOGGING_LEVEL");
    push("logging.format", &format!("{:?}", config.logging.format), "STOREOPS_LOGGING_FORMAT");

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("storeops.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/storeops.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
