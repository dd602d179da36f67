//! Configuration for the processor and vault.

use serde::{Deserialize, Serialize};
use signage_crypt::{CryptoSuite, KdfParams};

/// Configuration for a [`FileProcessor`](crate::FileProcessor).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Algorithm suite and byte lengths of the file format.
    pub suite: CryptoSuite,
}

/// Configuration for a [`Vault`](crate::Vault).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Argon2id cost for password-protected entries.
    pub kdf: KdfParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_config_from_json() {
        let config: VaultConfig =
            serde_json::from_str(r#"{"kdf": {"memory_kib": 4096}}"#).unwrap();
        assert_eq!(config.kdf.memory_kib, 4096);
        assert_eq!(config.kdf.iterations, KdfParams::default().iterations);

        let empty: VaultConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, VaultConfig::default());
    }

    #[test]
    fn test_processor_config_default_suite() {
        assert_eq!(ProcessorConfig::default().suite, CryptoSuite::V2);
    }
}
