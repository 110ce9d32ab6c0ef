pub mod extraction;
pub mod graph_store;

pub use extraction::{
    EXTRACTION_ADDED, EXTRACTION_SKIPPED, ExtractionOutcome, ExtractionRequest, ExtractionService,
    HttpExtractionService,
};
pub use graph_store::{GRAPH_INGEST_SUCCESS, GraphIngestApi, GraphIngestReply, HttpGraphStore};
