//! Classifier backends.
//!
//! A [`ClassificationBackend`] performs exactly one provider call per
//! invocation and returns the reply as a JSON object. Retrying, validation
//! and caching belong to [`ClassificationClient`](crate::client::ClassificationClient).

pub mod http;
pub mod prompt;
pub mod scripted;

use async_trait::async_trait;

use crate::credentials::ApiCredentials;
use crate::error::Result;
use crate::types::ClassificationRequest;

pub use http::HttpBackend;
pub use scripted::ScriptedBackend;

/// One classify-or-score call against an external model.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// Send `request` and return the model's JSON reply.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Transport`](crate::SieveError::Transport) for
    /// network or provider failures and
    /// [`SieveError::Validation`](crate::SieveError::Validation) when the
    /// reply is not a JSON object.
    async fn call(
        &self,
        credentials: &ApiCredentials,
        request: &ClassificationRequest,
    ) -> Result<serde_json::Value>;
}
