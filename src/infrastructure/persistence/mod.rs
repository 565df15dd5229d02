pub mod in_memory;
pub mod model_store;

pub use in_memory::InMemoryModelStore;
pub use model_store::{ARTIFACT_FORMAT_VERSION, FileModelStore};
