pub mod catalog;
pub mod error;
pub mod mock;
pub mod provider;
pub mod siliconflow;
pub mod types;

pub use error::ApiError;
pub use provider::SpeechService;
pub use siliconflow::SiliconFlow;
pub use types::*;
