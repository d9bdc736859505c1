//! Typed rows for the six target tables
//!
//! Plain structs with explicit foreign-key fields; child rows carry the
//! pre-allocated `instruction_id` of their parent instead of object
//! back-references. Rows are never mutated after construction.

use chrono::{DateTime, Utc};

/// One training example; `id` is the pre-allocated 1-based source position
#[derive(Debug, Clone)]
pub struct InstructionRow {
    pub id: i64,
    pub instruction_id: String,
    pub instruction_type: String,
    pub instruction: String,
    pub input_code: String,
    pub output_code: String,
    pub language: String,
    pub user_prompt: String,
    pub timestamp: DateTime<Utc>,
    pub model_used: String,
    pub created_at: DateTime<Utc>,
}

/// Dataset-level metadata; at most one row per ingested document
#[derive(Debug, Clone)]
pub struct DatasetMetadataRow {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub sample_count: i64,
    pub license: String,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// Extended context; zero or one row per instruction.
///
/// Structured sub-objects (project structure, dependency list, histories,
/// lint findings, tags) are stored whole as opaque JSON text blobs.
#[derive(Debug, Clone, Default)]
pub struct ContextMetadataRow {
    pub instruction_id: i64,
    pub error_message: Option<String>,
    pub terminal_output: Option<String>,
    pub execution_time: Option<f64>,
    pub successful_execution: Option<bool>,
    pub file_path: Option<String>,
    pub file_content: Option<String>,
    pub file_size: Option<i64>,
    pub file_line_count: Option<i64>,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub anonymized_user_id: Option<String>,
    pub skill_level: Option<String>,
    pub project_structure: Option<String>,
    pub dependencies: Option<String>,
    pub runtime_environment: Option<String>,
    pub llm_conversation_history: Option<String>,
    pub user_interaction_history: Option<String>,
    pub linting_errors: Option<String>,
    pub tags: Option<String>,
}

/// One declared project dependency
#[derive(Debug, Clone)]
pub struct ProjectDependencyRow {
    pub instruction_id: i64,
    pub name: String,
    pub version: Option<String>,
}

/// One lint finding
#[derive(Debug, Clone)]
pub struct LintingErrorRow {
    pub instruction_id: i64,
    pub line: Option<i64>,
    pub column: Option<i64>,
    pub message: String,
    pub severity: String,
    pub rule: Option<String>,
}

/// User feedback; zero or one row per instruction
#[derive(Debug, Clone)]
pub struct UserFeedbackRow {
    pub instruction_id: i64,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub was_helpful: Option<bool>,
    pub helped_solve_problem: Option<bool>,
}

/// A materialized row destined for one of the six tables
#[derive(Debug, Clone)]
pub enum Row {
    Instruction(InstructionRow),
    DatasetMetadata(DatasetMetadataRow),
    Context(ContextMetadataRow),
    Dependency(ProjectDependencyRow),
    Lint(LintingErrorRow),
    Feedback(UserFeedbackRow),
}

impl Row {
    /// Target table name
    pub fn table(&self) -> &'static str {
        match self {
            Row::Instruction(_) => "instruction_dataset",
            Row::DatasetMetadata(_) => "dataset_metadata",
            Row::Context(_) => "context_metadata",
            Row::Dependency(_) => "project_dependencies",
            Row::Lint(_) => "linting_errors",
            Row::Feedback(_) => "user_feedback",
        }
    }
}
