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
    pub model: String,
    pub triage_endpoint: Option<String>,
    pub log_level: Level,
    /// Minimum seconds between two questions, so the pacing feels human.
    pub question_gap_secs: u64,
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

        let model =
            std::env::var("VIVA_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-lite".to_string());

        let triage_endpoint = std::env::var("VIVA_TRIAGE_ENDPOINT")
            .ok()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let gap_str = std::env::var("VIVA_QUESTION_GAP_SECS").unwrap_or_else(|_| "4".to_string());
        let question_gap_secs = gap_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("VIVA_QUESTION_GAP_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            gemini_api_key,
            model,
            triage_endpoint,
            log_level,
            question_gap_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("VIVA_MODEL");
            env::remove_var("VIVA_TRIAGE_ENDPOINT");
            env::remove_var("RUST_LOG");
            env::remove_var("VIVA_QUESTION_GAP_SECS");
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
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(config.triage_endpoint, None);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.question_gap_secs, 4);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "custom-key");
            env::set_var("VIVA_MODEL", "gemini-2.5-pro");
            env::set_var("VIVA_TRIAGE_ENDPOINT", "http://localhost:5005/");
            env::set_var("RUST_LOG", "debug");
            env::set_var("VIVA_QUESTION_GAP_SECS", "0");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.model, "gemini-2.5-pro");
        // Trailing slash is dropped so path joining stays predictable.
        assert_eq!(
            config.triage_endpoint,
            Some("http://localhost:5005".to_string())
        );
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.question_gap_secs, 0);
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

    #[test]
    #[serial]
    fn test_config_invalid_question_gap() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
            env::set_var("VIVA_QUESTION_GAP_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "VIVA_QUESTION_GAP_SECS"),
            _ => panic!("Expected InvalidValue for VIVA_QUESTION_GAP_SECS"),
        }
    }
}
