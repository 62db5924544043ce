//! User-facing handles (spec.md §4.6): thin, typed wrappers over
//! [`crate::session::Session`] and the endpoint state machines, the
//! layer an application actually calls into.

pub mod act_loop;
pub mod download_stream;
pub mod downloaded_model;
pub mod embedding;
pub mod llm;
pub mod prediction_stream;

pub use act_loop::ActLoopHandle;
pub use download_stream::DownloadStream;
pub use downloaded_model::DownloadedModelHandle;
pub use embedding::EmbeddingHandle;
pub use llm::LlmHandle;
pub use prediction_stream::PredictionStream;
