use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::core::error::{Result, SummaryError};
use crate::models::SummaryConfig;

/// Read a JSON configuration file. A missing file yields the defaults.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<SummaryConfig> {
    let path = path.as_ref();

    let data = match fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(SummaryConfig::default());
        }
        Err(e) => {
            return Err(SummaryError::Config(format!(
                "File read error: {e} {}",
                path.display()
            )))
        }
    };

    let config: SummaryConfig = serde_json::from_str(&data)
        .map_err(|e| SummaryError::Config(format!("JSON parse error: {e}")))?;

    info!(
        "Configuration loaded from {} (mode {:?}, {} sections)",
        path.display(),
        config.mode,
        config.sections.len()
    );
    Ok(config)
}
