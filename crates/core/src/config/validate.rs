use super::{types::Config, ConfigError};
use crate::coordinator::Stage;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Every stage lane admits at least one job
/// - Stream ceiling is at least 1
/// - Transcoder has a non-empty ladder and a positive size cap
/// - Fetcher progress interval is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    for stage in Stage::ALL {
        if config.coordinator.lanes(stage) == 0 {
            return Err(ConfigError::ValidationError(format!(
                "coordinator.{}_lanes must be at least 1",
                stage
            )));
        }
    }

    if config.streams.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "streams.max_concurrent must be at least 1".to_string(),
        ));
    }

    if config.transcoder.ladder.is_empty() {
        return Err(ConfigError::ValidationError(
            "transcoder.ladder must contain at least one tier".to_string(),
        ));
    }

    if config.transcoder.max_output_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.max_output_bytes must be positive".to_string(),
        ));
    }

    if config.fetcher.progress_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "fetcher.progress_interval_ms must be positive".to_string(),
        ));
    }

    Ok(())
}
