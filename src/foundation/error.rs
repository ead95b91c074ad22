/// Convenience result type used across framefold.
pub type FoldResult<T> = Result<T, FoldError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum FoldError {
    /// Invalid configuration, arguments, or inconsistent raster shapes.
    #[error("validation error: {0}")]
    Validation(String),

    /// Renderer or build process could not be launched, or retries were exhausted.
    #[error("render error: {0}")]
    Render(String),

    /// Raster read/write failures.
    #[error("store error: {0}")]
    Store(String),

    /// On-disk progress state that cannot be interpreted.
    #[error("resume error: {0}")]
    Resume(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FoldError {
    /// Build a [`FoldError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FoldError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`FoldError::Store`] value.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Build a [`FoldError::Resume`] value.
    pub fn resume(msg: impl Into<String>) -> Self {
        Self::Resume(msg.into())
    }
}

impl From<std::io::Error> for FoldError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
