//! Pipeline configuration
//!
//! Every knob lives in an explicit [`RefineryConfig`] value that is passed
//! into each component's constructor; there is no process-wide settings
//! singleton. `from_env` reads the same environment variables the deployment
//! containers set (`.env` files are loaded by the CLI via dotenvy before
//! this is called).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::schema::SchemaProfile;

/// Plaintext store file name inside the output directory
pub const DB_FILE_NAME: &str = "db.libsql";
/// Schema descriptor artifact name
pub const SCHEMA_FILE_NAME: &str = "schema.json";
/// Run outcome artifact name
pub const OUTPUT_FILE_NAME: &str = "output.json";
/// Suffix appended to the store file name for the sealed artifact
pub const SEALED_SUFFIX: &str = ".enc";

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineryConfig {
    /// Directory scanned for the input JSON document
    pub input_dir: PathBuf,

    /// Directory where the store, schema and run artifacts are written
    pub output_dir: PathBuf,

    /// Passphrase for the encryption envelope; `None` skips sealing
    pub encryption_key: Option<String>,

    /// Human-readable schema descriptor metadata
    pub schema_name: String,
    pub schema_version: String,
    pub schema_description: String,
    pub schema_dialect: String,

    /// Field-optionality rules applied during mapping
    pub profile: SchemaProfile,

    /// Pinning service credentials; both must be present to publish
    pub pinata_api_key: Option<String>,
    pub pinata_api_secret: Option<String>,

    /// Gateway prefix used to build the retrieval URL by concatenation
    pub ipfs_gateway_url: String,
}

impl Default for RefineryConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("/input"),
            output_dir: PathBuf::from("/output"),
            encryption_key: None,
            schema_name: "Coding Assistant Training Data Schema".to_string(),
            schema_version: "1.0.0".to_string(),
            schema_description:
                "Schema for collecting high-quality data from VS Code extension for fine-tuning coding language models"
                    .to_string(),
            schema_dialect: "sqlite".to_string(),
            profile: SchemaProfile::default(),
            pinata_api_key: None,
            pinata_api_secret: None,
            ipfs_gateway_url: "https://gateway.pinata.cloud/ipfs".to_string(),
        }
    }
}

impl RefineryConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// Unset or empty variables fall back to the defaults above.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            input_dir: env_var("INPUT_DIR").map(PathBuf::from).unwrap_or(base.input_dir),
            output_dir: env_var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(base.output_dir),
            encryption_key: env_var("REFINEMENT_ENCRYPTION_KEY"),
            schema_name: env_var("SCHEMA_NAME").unwrap_or(base.schema_name),
            schema_version: env_var("SCHEMA_VERSION").unwrap_or(base.schema_version),
            schema_description: env_var("SCHEMA_DESCRIPTION").unwrap_or(base.schema_description),
            schema_dialect: env_var("SCHEMA_DIALECT").unwrap_or(base.schema_dialect),
            profile: env_var("SCHEMA_PROFILE")
                .and_then(|v| SchemaProfile::parse(&v))
                .unwrap_or_default(),
            pinata_api_key: env_var("PINATA_API_KEY"),
            pinata_api_secret: env_var("PINATA_API_SECRET"),
            ipfs_gateway_url: env_var("IPFS_GATEWAY_URL").unwrap_or(base.ipfs_gateway_url),
        }
    }

    /// Set the input directory
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the envelope passphrase
    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Set the schema profile
    pub fn with_profile(mut self, profile: SchemaProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Path of the plaintext store artifact
    pub fn db_path(&self) -> PathBuf {
        self.output_dir.join(DB_FILE_NAME)
    }

    /// Path of the schema descriptor artifact
    pub fn schema_path(&self) -> PathBuf {
        self.output_dir.join(SCHEMA_FILE_NAME)
    }

    /// Path of the run outcome artifact
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }

    /// Whether both pinning credentials are configured
    pub fn has_publication_credentials(&self) -> bool {
        self.pinata_api_key.is_some() && self.pinata_api_secret.is_some()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
