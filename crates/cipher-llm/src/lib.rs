pub mod error;
pub mod gemini;
pub mod provider;
pub mod retry;

pub use error::{InferenceError, Result};
pub use gemini::GeminiInference;
pub use provider::InferenceService;
pub use retry::{RetryPolicy, RetryingInference};
