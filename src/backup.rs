//! Pre-change configuration backups.
//!
//! When a reconciliation requests a backup, the running configuration is
//! recorded verbatim before any mutation and written to a timestamped file
//! so an operator can restore by hand if an apply goes sideways.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Metadata for a configuration backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBackup {
    /// Unique backup identifier
    pub id: String,
    /// Device identifier the configuration was fetched from
    pub host: String,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Path to the backup file
    pub file_path: PathBuf,
    /// SHA256 checksum of the configuration
    pub checksum: String,
    /// Size in bytes
    pub size: u64,
}

/// Generate a backup filename based on device and timestamp.
pub fn generate_backup_filename(host: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_running_{}.cfg", host, timestamp)
}

/// Calculate the SHA256 checksum of configuration content.
pub fn calculate_config_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write a backup of `content` under `dir`, creating directories as needed.
pub fn write_backup(dir: &Path, host: &str, content: &str) -> Result<ConfigBackup> {
    std::fs::create_dir_all(dir)?;
    let file_path = dir.join(generate_backup_filename(host));
    std::fs::write(&file_path, content)?;

    Ok(ConfigBackup {
        id: uuid::Uuid::new_v4().to_string(),
        host: host.to_string(),
        created_at: Utc::now(),
        file_path,
        checksum: calculate_config_checksum(content),
        size: content.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_filename_shape() {
        let filename = generate_backup_filename("router1");
        assert!(filename.starts_with("router1_running_"));
        assert!(filename.ends_with(".cfg"));
    }

    #[test]
    fn test_config_checksum_is_sha256_hex() {
        let checksum = calculate_config_checksum("hostname R1\n");
        assert_eq!(checksum.len(), 64);
        // Stable for identical content
        assert_eq!(checksum, calculate_config_checksum("hostname R1\n"));
    }

    #[test]
    fn test_write_backup_round_trip() {
        let dir = TempDir::new().unwrap();
        let content = "hostname R1\ninterface Gi0/0\n no shutdown\n";

        let backup = write_backup(dir.path(), "router1", content).unwrap();
        assert_eq!(backup.host, "router1");
        assert_eq!(backup.size, content.len() as u64);

        let written = std::fs::read_to_string(&backup.file_path).unwrap();
        assert_eq!(written, content);
    }

    #[test]
    fn test_write_backup_creates_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("backups/site-a");
        let backup = write_backup(&nested, "sw1", "vlan 10\n").unwrap();
        assert!(backup.file_path.starts_with(&nested));
    }
}
