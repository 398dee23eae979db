//! cvsearch - multi-field weighted semantic search over resumes.
//!
//! Every resume is stored as five independently embedded fields (summary,
//! skills, work history, project history, education). A search queries each
//! field separately, turns cosine distances into similarities, keeps each
//! candidate's best match per field and ranks candidates by the weighted sum
//! of those similarities.
//!
//! # Quick start
//!
//! ```no_run
//! use cvsearch::{ConfigDb, DataDir, FieldWeights, TopK, VectorStore};
//! use cvsearch::embedder::resolve_embedder;
//! use cvsearch::search::{self, SearchParams};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let config_db = ConfigDb::open(&data_dir.config_db()).unwrap();
//! let store = VectorStore::open(&data_dir.vectors_db()).unwrap();
//! let embedder = resolve_embedder(None, None, &config_db).unwrap();
//!
//! let params = SearchParams {
//!     query: "senior rust engineer".to_string(),
//!     count: TopK::new(5),
//!     full: false,
//! };
//!
//! let results = search::execute_search(
//!     &params,
//!     &store,
//!     embedder.as_ref(),
//!     FieldWeights::default(),
//! )
//! .unwrap();
//! for r in &results {
//!     println!("{} ({:.3})", r.candidate.name, r.candidate.total_score);
//! }
//! ```
//!
//! The ranking core does not depend on the store: anything implementing
//! [`SimilarityOracle`] can back a [`ResumeSearchEngine`].

pub mod aggregate;
pub mod config_db;
pub mod data_dir;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod field;
pub mod ingestion;
pub mod mcp;
pub mod model_manager;
pub mod oracle;
pub mod ranking;
pub mod resume;
pub mod scoring;
pub mod search;
pub mod text_util;
pub mod vector_store;
pub mod weights;

pub use aggregate::{CandidateScore, FieldMatch};
pub use config_db::ConfigDb;
pub use data_dir::DataDir;
pub use embedder::{Embedder, HashEmbedder};
pub use engine::{EnrichedCandidate, ResumeSearchEngine};
pub use error::{Error, Result};
pub use field::ResumeField;
pub use model_manager::ModelManager;
pub use oracle::{ResumeStore, SimilarityOracle};
pub use ranking::TopK;
pub use resume::ResumeRecord;
pub use vector_store::VectorStore;
pub use weights::FieldWeights;
