//! Completion model client.
//!
//! Provides the [`Backend`] trait the tools talk to, and the Anthropic
//! Messages API implementation of it.
//!
//! # Example
//!
//! ```no_run
//! use model::{AnthropicBackend, complete};
//!
//! # async fn example() -> Result<(), model::ModelError> {
//! let backend = AnthropicBackend::builder("sk-ant-...").max_tokens(1024).build();
//! let answer = complete(&backend, "Summarize: the deploy failed twice.").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

mod anthropic;
pub mod errors;
pub mod types;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use errors::ModelError;
pub use types::{Backend, Message, ModelRequest, ModelResponse, Role, Usage, complete};
