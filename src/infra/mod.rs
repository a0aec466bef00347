// Artifact store adapters behind the ArtifactStorePort trait

pub mod fs_store;
pub mod http_store;
pub mod memory_store;

pub use fs_store::FsArtifactStore;
pub use http_store::HttpArtifactStore;
pub use memory_store::InMemoryArtifactStore;
