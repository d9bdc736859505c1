//! Pipeline orchestration — one run from input document to published artifact
//!
//! Control flow: raw document → field mapper → relational materializer →
//! store writer → encryption envelope → publication. Only validation and
//! store-write failures abort the run; sealing and publication degrade with
//! a diagnostic, so a run without an encryption key or pinning credentials
//! still produces a usable local artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::{RefineryConfig, SEALED_SUFFIX};
use crate::envelope;
use crate::error::{RefineryError, Result};
use crate::materialize::Materializer;
use crate::publish::{retrieval_url, PinataClient, Publisher};
use crate::schema::SchemaDescriptor;
use crate::store::StoreWriter;

/// Outcome of one refinement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// The schema descriptor as persisted to `schema.json`
    pub schema: SchemaDescriptor,
    /// Retrieval URL of the published artifact, when publication occurred
    pub refinement_url: Option<String>,
}

/// The transformation-and-persistence pipeline
pub struct Refinery {
    config: RefineryConfig,
}

impl Refinery {
    pub fn new(config: RefineryConfig) -> Self {
        Self { config }
    }

    /// Execute one full run against the configured input location.
    pub fn run(&self) -> Result<RunOutput> {
        let input = self.find_input_document()?;
        info!(input = %input.display(), "starting refinement");

        let raw = std::fs::read_to_string(&input)?;
        let document: Value = serde_json::from_str(&raw)?;

        let rows = Materializer::new(self.config.profile).materialize(&document)?;

        std::fs::create_dir_all(&self.config.output_dir)?;
        let db_path = self.config.db_path();
        let mut writer = StoreWriter::create(&db_path)?;
        let written = writer.write_rows(&rows)?;
        info!(rows = written, store = %db_path.display(), "materialized relational store");

        let schema = SchemaDescriptor::from_config(&self.config, writer.get_schema());
        std::fs::write(
            self.config.schema_path(),
            serde_json::to_string_pretty(&schema)?,
        )?;

        let artifact = self.seal_artifact(&db_path);
        let refinement_url = self.publish(&schema, &artifact);

        let output = RunOutput {
            schema,
            refinement_url,
        };
        std::fs::write(
            self.config.output_path(),
            serde_json::to_string_pretty(&output)?,
        )?;
        info!("refinement completed");
        Ok(output)
    }

    /// Pick the input document: the first `*.json` file in the input
    /// directory, in lexicographic order for determinism.
    fn find_input_document(&self) -> Result<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&self.config.input_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().next().ok_or_else(|| {
            RefineryError::InvalidInput(format!(
                "no JSON document found in '{}'",
                self.config.input_dir.display()
            ))
        })
    }

    /// Seal the store when a key is configured. A seal failure degrades to
    /// the plaintext artifact with a warning rather than aborting the run.
    fn seal_artifact(&self, db_path: &Path) -> PathBuf {
        let Some(key) = &self.config.encryption_key else {
            warn!("no encryption key configured, artifact stays plaintext");
            return db_path.to_path_buf();
        };
        let mut sealed_name = db_path.as_os_str().to_owned();
        sealed_name.push(SEALED_SUFFIX);
        match envelope::seal_file(key, db_path, Some(Path::new(&sealed_name))) {
            Ok(sealed) => sealed,
            Err(e) => {
                warn!(error = %e, "encryption failed, continuing with plaintext artifact");
                db_path.to_path_buf()
            }
        }
    }

    /// Upload the schema and artifact when credentials are present. Missing
    /// credentials is not an error; a failed upload is logged and the run
    /// still succeeds without a URL.
    fn publish(&self, schema: &SchemaDescriptor, artifact: &Path) -> Option<String> {
        let client = match PinataClient::from_config(&self.config) {
            Some(Ok(client)) => client,
            Some(Err(e)) => {
                error!(error = %e, "publication client could not be built");
                return None;
            }
            None => {
                warn!("publication credentials not available, skipping upload");
                return None;
            }
        };

        match serde_json::to_value(schema) {
            Ok(schema_value) => match client.upload_json(&schema_value) {
                Ok(address) => info!(%address, "schema published"),
                Err(e) => error!(error = %e, "schema publication failed"),
            },
            Err(e) => error!(error = %e, "schema could not be serialized for publication"),
        }

        match client.upload_file(artifact) {
            Ok(address) => {
                info!(%address, artifact = %artifact.display(), "artifact published");
                Some(retrieval_url(&self.config.ipfs_gateway_url, &address))
            }
            Err(e) => {
                error!(error = %e, "artifact publication failed, run continues without URL");
                None
            }
        }
    }
}
