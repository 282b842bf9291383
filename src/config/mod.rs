// Configuration module entry point
// Loads configuration once at startup and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::Config;

/// Environment variable naming the config file (without extension)
const CONFIG_PATH_ENV: &str = "APP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from `.env`, the config file and the environment.
    ///
    /// The config file path comes from `APP_CONFIG` and defaults to `config`
    /// (any extension the `config` crate understands, e.g. `config.toml`).
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();

        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Plain `PORT`, `SERVER_HOST`, `CHANNEL_ARN`, `AWS_REGION` and `STATIC_ROOT`
    /// variables override both the file and `APP_*` variables.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("static_files.root", "./frontend/dist")?
            .set_default("static_files.fallback", "index.html")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "ivs-stream-backend")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_override_option("server.host", env("SERVER_HOST"))?
            .set_override_option("server.port", env("PORT"))?
            .set_override_option("stream.channel_arn", env("CHANNEL_ARN"))?
            .set_override_option("stream.region", env("AWS_REGION"))?
            .set_override_option("static_files.root", env("STATIC_ROOT"))?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.stream.channel_arn.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "stream.channel_arn is required (set CHANNEL_ARN)".to_string(),
            ));
        }
        if self.static_files.root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "static_files.root must not be empty".to_string(),
            ));
        }
        if self.static_files.fallback.contains('/') || self.static_files.fallback.contains("..") {
            return Err(config::ConfigError::Message(format!(
                "static_files.fallback must be a plain file name, got '{}'",
                self.static_files.fallback
            )));
        }
        if let Err(e) = self.logging.level.parse::<crate::logger::Level>() {
            return Err(config::ConfigError::Message(e));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::types::{
        HttpConfig, LoggingConfig, PerformanceConfig, RoutesConfig, ServerConfig,
        StaticFilesConfig, StreamConfig,
    };
    use super::*;

    /// Configuration used by tests across the crate
    pub fn test_config(static_root: &str) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                workers: None,
            },
            stream: StreamConfig {
                channel_arn: "arn:aws:ivs:us-west-2:123456789012:channel/abcd".to_string(),
                region: Some("us-west-2".to_string()),
            },
            static_files: StaticFilesConfig {
                root: static_root.to_string(),
                fallback: "index.html".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: false,
                access_log_format: "combined".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
            http: HttpConfig {
                server_name: "test-server".to_string(),
                max_body_size: 1024,
            },
            routes: RoutesConfig::default(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let cfg = test_config("dist");
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:3001".parse().unwrap()
        );

        let mut bad = test_config("dist");
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }

    #[test]
    fn test_validate_requires_channel() {
        let mut cfg = test_config("dist");
        assert!(cfg.validate().is_ok());

        cfg.stream.channel_arn = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fallback_and_level() {
        let mut cfg = test_config("dist");
        cfg.static_files.fallback = "../secret.html".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = test_config("dist");
        cfg.logging.level = "loud".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8088

[stream]
channel_arn = "arn:aws:ivs:eu-west-1:123456789012:channel/file"

[static_files]
root = "/srv/www"
fallback = "app.html"

[logging]
access_log_format = "json"
"#,
        )
        .unwrap();

        let base = path.with_extension("");
        let cfg = Config::load_from(base.to_str().unwrap()).unwrap();
        // Only keys without a plain environment override are checked, so the
        // result does not depend on STATIC_ROOT, PORT or CHANNEL_ARN
        assert_eq!(cfg.static_files.fallback, "app.html");
        assert_eq!(cfg.logging.access_log_format, "json");
        assert_eq!(cfg.performance.keep_alive_timeout, 75);
        assert!(cfg.routes.health.enabled);
    }
}
