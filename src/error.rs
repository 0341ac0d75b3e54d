pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported by an identity provider call.
///
/// The split matters to the auth flow: provider rejections are shown to the user verbatim, while
/// anything unexpected is logged and replaced with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider understood the request and refused it, e.g. invalid credentials or an
    /// already-registered email.
    #[error("{message}")]
    Provider { message: String },

    /// Transport failures, unreadable responses and local I/O problems.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IdentityError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}
