pub mod error;
pub mod naming;
pub mod payload;

pub use error::{Error, Result};
pub use naming::{pages_url, repository_name};
pub use payload::EvaluationPayload;
