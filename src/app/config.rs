use std::path::Path;

use crate::config::ResolvedConfig;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "inbox_directory": config.inbox_dir.display().to_string(),
        "ingest": {
            "fetch_concurrency": config.ingest.fetch_concurrency,
            "fetch_max_attempts": config.ingest.fetch_max_attempts,
            "retry_base_delay_ms": config.ingest.retry_base_delay_ms,
            "retry_max_delay_ms": config.ingest.retry_max_delay_ms,
            "write_max_attempts": config.ingest.write_max_attempts
        }
    })
}
