use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Address the request socket binds to
    pub bind_addr: String,
    /// Number of worker-pool threads draining the dispatch queue
    pub threads: usize,
    /// Age after which terminated results are swept from the store
    pub result_expiry_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            bind_addr: "127.0.0.1:5550".to_string(),
            threads: 5,
            result_expiry_secs: 24 * 60 * 60,
        }
    }
}

impl WorkerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn result_expiry(&self) -> Duration {
        Duration::from_secs(self.result_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5550");
        assert_eq!(config.threads, 5);
        assert_eq!(config.result_expiry(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = WorkerConfig {
            bind_addr: "0.0.0.0:7000".to_string(),
            threads: 2,
            result_expiry_secs: 60,
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: WorkerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.bind_addr, "0.0.0.0:7000");
        assert_eq!(parsed.threads, 2);
        assert_eq!(parsed.result_expiry_secs, 60);
    }
}
