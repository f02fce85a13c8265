pub mod embedder;
pub mod retrieval;
pub mod sql;
pub mod store;

pub use embedder::{EmbedError, Embedder, OpenAIEmbedder};
pub use retrieval::DocSearchTool;
pub use sql::SqlTool;
pub use store::{Chunk, SqliteChunkStore, StoreError};
