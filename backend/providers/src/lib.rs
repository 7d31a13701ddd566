pub mod llama;
pub mod mock;
pub mod sse;

pub use llama::LlamaProvider;
pub use mock::MockVisionProvider;
