// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for remote cache operations.

/// An error from a remote cache operation.
///
/// This is an opaque error type that can wrap any underlying error from a transport or
/// server. Near cache decorators pass it through unchanged. Use
/// [`std::error::Error::source()`] to access the underlying cause if needed.
///
/// # Example
///
/// ```
/// use nearcache_tier::Error;
///
/// let error = Error::from_message("connection reset");
/// ```
#[ohno::error]
#[derive(Clone)]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearcache_tier::Error;
    ///
    /// let error = Error::from_message("operation failed");
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for remote cache operations.
pub type Result<T> = std::result::Result<T, Error>;
