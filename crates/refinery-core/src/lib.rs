//! Refinery Core - deterministic refinement of coding-assistant training data
//!
//! Refinery ingests a single structured JSON document describing
//! coding-assistant training interactions and materializes it into a
//! relational SQLite store with a fixed, documented schema, suitable for
//! downstream query engines that expect a stable table layout. The finished
//! store can then be sealed in a passphrase envelope and published to
//! content-addressable storage.
//!
//! # Architecture
//!
//! The pipeline is built leaf-first:
//!
//! 1. **Schema Descriptor** (`schema`): versioned declaration of the target tables
//! 2. **Field Mapper** (`mapper`): pure per-record value normalization
//! 3. **Relational Materializer** (`materialize`): typed rows with explicit foreign keys
//! 4. **Store Writer** (`store`): transactional SQLite persistence, full replace per run
//! 5. **Encryption Envelope** (`envelope`): armored passphrase protection
//! 6. **Publication Client** (`publish`): IPFS pinning collaborator
//!
//! # Quick Start
//!
//! ```no_run
//! use refinery_core::{Refinery, RefineryConfig};
//!
//! let config = RefineryConfig::from_env()
//!     .with_input_dir("input")
//!     .with_output_dir("output");
//!
//! let output = Refinery::new(config).run().unwrap();
//! println!("dialect: {}", output.schema.dialect);
//! if let Some(url) = output.refinement_url {
//!     println!("published at {}", url);
//! }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod mapper;
pub mod materialize;
pub mod model;
pub mod publish;
pub mod refine;
pub mod schema;
pub mod store;

pub use config::RefineryConfig;
pub use error::{RefineryError, Result};
pub use refine::{Refinery, RunOutput};
pub use schema::{SchemaDescriptor, SchemaProfile};
