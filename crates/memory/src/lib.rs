//! Memory implementations for Orchestra.
//!
//! - [`InMemoryStore`]: ranked recall over documents held in process
//! - [`NoopMemory`]: memory disabled
//! - [`TokenTextSplitter`]: cuts step transcripts into storable chunks

pub mod noop;
pub mod in_memory;
pub mod similarity;
pub mod splitter;

pub use noop::NoopMemory;
pub use in_memory::InMemoryStore;
pub use similarity::{cosine_similarity, term_vector};
pub use splitter::TokenTextSplitter;
