//! missing-refs library for detecting missing references in scene graphs.
//!
//! This library scans the object graphs of open documents (scenes and
//! prefabs) for references that no longer resolve. The core workflow involves
//! three phases:
//!
//! 1. **Scanning**: Walk each document's objects and components, flagging
//!    missing scripts, missing prefab sources, dangling object references and
//!    broken persisted event calls
//! 2. **Salvage**: Recover the serialized fields of missing scripts from the
//!    raw document text
//! 3. **Candidates**: Rank loaded types that could replace a vanished one by
//!    edit distance, matched to their source assets
//!
//! The engine only talks to its host through the traits in [`host`].
//! [`snapshot::Snapshot`] and [`project::ProjectIndex`] are file-backed hosts.
//!
//! # Example
//!
//! ```no_run
//! use missing_refs::candidates::{CandidateSearch, SearchCache};
//! use missing_refs::config::{ScanOptions, SearchConfig};
//! use missing_refs::graph::Scanner;
//! use missing_refs::project::ProjectIndex;
//! use missing_refs::snapshot::Snapshot;
//! use std::path::Path;
//!
//! // Load editor state and scan every open document
//! let snapshot = Snapshot::load(Path::new("state.json")).unwrap();
//! let session = Scanner::new(&snapshot, ScanOptions::default()).run().unwrap();
//! println!("Found {} missing references", session.total_count());
//!
//! // Look for replacements of a vanished script type
//! let config = SearchConfig::default();
//! let index = ProjectIndex::build(Path::new("."), &[], true, &config.source_extension).unwrap();
//! let search = CandidateSearch::new(&snapshot, &index, &config).unwrap();
//! let mut cache = SearchCache::new();
//! for candidate in search.search(&mut cache, "Game.Health, Assembly-CSharp") {
//!     println!("{} ({})", candidate.type_info.full_name, candidate.distance);
//! }
//! ```

pub mod candidates;
pub mod classifier;
pub mod config;
pub mod distance;
pub mod graph;
pub mod host;
pub mod identifier;
pub mod project;
pub mod report;
pub mod salvage;
pub mod snapshot;

// Re-export commonly used types at crate root
pub use candidates::{CandidateMatch, CandidateSearch, SearchCache};
pub use config::{ScanOptions, SearchConfig};
pub use graph::{ComponentReport, GraphNode, ScanSession, Scanner};
pub use host::{ObjectId, PropertyRef, ReferenceLocator, SceneHost};
