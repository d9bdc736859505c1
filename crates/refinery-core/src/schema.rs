//! Schema Descriptor — static, versioned declaration of the relational shape
//!
//! The DDL below is the single source of truth for the store layout. It is
//! applied verbatim by the store writer and embedded verbatim in the
//! [`SchemaDescriptor`] artifact, so external query engines see exactly what
//! was persisted.

use serde::{Deserialize, Serialize};

use crate::config::RefineryConfig;

/// Full DDL for the six tables and their indexes.
///
/// Child tables reference `instruction_dataset(id)` with ON DELETE CASCADE;
/// foreign keys are enforced by the writer (`PRAGMA foreign_keys = ON`).
pub const DDL: &str = r#"
CREATE TABLE instruction_dataset (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_id   TEXT NOT NULL,
    instruction_type TEXT NOT NULL,
    instruction      TEXT NOT NULL,
    input_code       TEXT NOT NULL,
    output_code      TEXT,
    language         TEXT,
    user_prompt      TEXT,
    timestamp        TEXT NOT NULL,
    model_used       TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE TABLE dataset_metadata (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    version      TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    sample_count INTEGER NOT NULL,
    license      TEXT NOT NULL,
    source       TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE context_metadata (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_id           INTEGER NOT NULL REFERENCES instruction_dataset(id) ON DELETE CASCADE,
    error_message            TEXT,
    terminal_output          TEXT,
    execution_time           REAL,
    successful_execution     INTEGER,
    file_path                TEXT,
    file_content             TEXT,
    file_size                INTEGER,
    file_line_count          INTEGER,
    framework                TEXT,
    language                 TEXT,
    anonymized_user_id       TEXT,
    skill_level              TEXT,
    project_structure        TEXT,
    dependencies             TEXT,
    runtime_environment      TEXT,
    llm_conversation_history TEXT,
    user_interaction_history TEXT,
    linting_errors           TEXT,
    tags                     TEXT
);

CREATE TABLE project_dependencies (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_id INTEGER NOT NULL REFERENCES instruction_dataset(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    version        TEXT
);

CREATE TABLE linting_errors (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_id INTEGER NOT NULL REFERENCES instruction_dataset(id) ON DELETE CASCADE,
    line           INTEGER,
    "column"       INTEGER,
    message        TEXT NOT NULL,
    severity       TEXT NOT NULL DEFAULT 'error',
    rule           TEXT
);

CREATE TABLE user_feedback (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    instruction_id       INTEGER NOT NULL REFERENCES instruction_dataset(id) ON DELETE CASCADE,
    rating               INTEGER,
    comment              TEXT,
    was_helpful          INTEGER,
    helped_solve_problem INTEGER
);

CREATE INDEX idx_instruction_type ON instruction_dataset(instruction_type);
CREATE INDEX idx_instruction_language ON instruction_dataset(language);
CREATE INDEX idx_context_instruction ON context_metadata(instruction_id);
CREATE INDEX idx_dependencies_instruction ON project_dependencies(instruction_id);
CREATE INDEX idx_linting_instruction ON linting_errors(instruction_id);
CREATE INDEX idx_feedback_instruction ON user_feedback(instruction_id);
"#;

/// Field-optionality rules applied by the mapper.
///
/// `Rich` is the canonical profile: missing core fields are filled with an
/// explicit default ("unknown" or empty string). `Strict` is the legacy
/// compatibility mode in which a missing required field aborts the run with
/// a validation error naming the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaProfile {
    #[default]
    Rich,
    Strict,
}

impl SchemaProfile {
    /// Parse a profile name as used in `SCHEMA_PROFILE`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rich" => Some(Self::Rich),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Schema-describing artifact published alongside the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub dialect: String,
    /// Verbatim DDL text as persisted by the store writer
    pub schema: String,
}

impl SchemaDescriptor {
    /// Build a descriptor from the configuration and the DDL text as applied
    pub fn from_config(config: &RefineryConfig, ddl: &str) -> Self {
        Self {
            name: config.schema_name.clone(),
            version: config.schema_version.clone(),
            description: config.schema_description.clone(),
            dialect: config.schema_dialect.clone(),
            schema: ddl.to_string(),
        }
    }
}
