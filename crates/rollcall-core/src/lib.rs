//! rollcall-core — Known-face registry and live matching.
//!
//! Roster rows resolve to reference photos, photos resolve to embeddings
//! (SCRFD detection + ArcFace embedding via ONNX Runtime), and probe faces
//! match against the registry by Euclidean distance with first-acceptable
//! semantics.

pub mod analyzer;
pub mod detector;
pub mod embedder;
pub mod link;
pub mod registry;
pub mod types;

pub use analyzer::{AnalyzerError, DetectedFace, FaceAnalyzer, OnnxFaceAnalyzer};
pub use registry::{build_registry, BuildReport, KnownFace, KnownFaceRegistry};
pub use types::{Embedding, FaceBox, FirstAcceptableMatcher, MatchResult, Matcher, RosterRow};
