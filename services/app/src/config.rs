use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub tts_model: String,
    pub analysis_model: String,
    pub catalog_path: PathBuf,
    pub progress_path: PathBuf,
    /// Upper bound on any single speech-gateway request.
    pub gateway_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY".to_string()))?;

        let tts_model = std::env::var("TTS_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string());

        let analysis_model =
            std::env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".to_string());

        let catalog_path = std::env::var("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/catalog.json"));

        let progress_path = std::env::var("PROGRESS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./progress.json"));

        let timeout_str =
            std::env::var("GATEWAY_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "GATEWAY_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a valid number of seconds", timeout_str),
            )
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_TIMEOUT_SECS".to_string(),
                "timeout must be at least one second".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            gemini_api_key,
            tts_model,
            analysis_model,
            catalog_path,
            progress_path,
            gateway_timeout: Duration::from_secs(timeout_secs),
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("TTS_MODEL");
            env::remove_var("ANALYSIS_MODEL");
            env::remove_var("CATALOG_PATH");
            env::remove_var("PROGRESS_PATH");
            env::remove_var("GATEWAY_TIMEOUT_SECS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.gemini_api_key, "test-gemini-key");
        assert_eq!(config.tts_model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.analysis_model, "gemini-3-flash-preview");
        assert_eq!(config.catalog_path, PathBuf::from("./data/catalog.json"));
        assert_eq!(config.progress_path, PathBuf::from("./progress.json"));
        assert_eq!(config.gateway_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "custom-gemini-key");
            env::set_var("TTS_MODEL", "custom-tts-model");
            env::set_var("ANALYSIS_MODEL", "custom-analysis-model");
            env::set_var("CATALOG_PATH", "/custom/catalog.json");
            env::set_var("PROGRESS_PATH", "/custom/progress.json");
            env::set_var("GATEWAY_TIMEOUT_SECS", "10");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.gemini_api_key, "custom-gemini-key");
        assert_eq!(config.tts_model, "custom-tts-model");
        assert_eq!(config.analysis_model, "custom-analysis-model");
        assert_eq!(config.catalog_path, PathBuf::from("/custom/catalog.json"));
        assert_eq!(config.progress_path, PathBuf::from("/custom/progress.json"));
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_missing_gemini_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeout() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
            env::set_var("GATEWAY_TIMEOUT_SECS", "not-a-number");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "GATEWAY_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for GATEWAY_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_zero_timeout_rejected() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
            env::set_var("GATEWAY_TIMEOUT_SECS", "0");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "GATEWAY_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for GATEWAY_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
