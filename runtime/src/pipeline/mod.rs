pub mod analysis;
pub mod coordinator;
pub mod kg;
pub mod merge;
pub mod parse;
pub mod types;

pub use analysis::{AnalysisJob, ArtifactKind, MISSING_CREDENTIAL_MESSAGE};
pub use coordinator::{Coordinator, IngestError, IngestReceipt, NewSource};
pub use kg::KgJob;
pub use merge::merge_fragments;
pub use parse::parse_json_lenient;
pub use types::{GraphEdge, GraphFragment, GraphNode, MergedGraph, TextChunk};
