//! `allcache` error code

use thiserror::Error;

/// `allcache` Result type
pub type CacheResult<T> = Result<T, CacheError>;

/// `allcache` error code
///
/// Only configuration and construction fail recoverably. A running cache
/// whose bookkeeping breaks panics instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Argument is invalid
    #[error("ArgumentInvalid, context is {:#?}", .context)]
    ArgumentInvalid {
        /// Context of the error
        context: Vec<String>,
    },

    /// Replacement policy name is not recognized
    #[error("Policy name={} is unknown, context is {:#?}", .name, .context)]
    UnknownPolicy {
        /// The rejected policy name
        name: String,
        /// Context of the error
        context: Vec<String>,
    },
}

/// Add context for `CacheResult`
pub trait Context<T> {
    /// Add context to `CacheResult`
    fn add_context<C>(self, ctx: C) -> CacheResult<T>
    where
        C: Into<String>;

    /// Add context to `CacheResult` lazily
    fn with_context<C, F>(self, f: F) -> CacheResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> Context<T> for CacheResult<T> {
    #[inline]
    fn add_context<C>(self, ctx: C) -> CacheResult<T>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.add_context(ctx))
    }

    #[inline]
    fn with_context<C, F>(self, f: F) -> CacheResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.add_context(f()))
    }
}

impl CacheError {
    /// Build an `ArgumentInvalid` error from one message.
    #[inline]
    #[must_use]
    pub fn invalid_argument<C>(ctx: C) -> Self
    where
        C: Into<String>,
    {
        Self::ArgumentInvalid {
            context: vec![ctx.into()],
        }
    }

    /// Add context for `CacheError`
    #[inline]
    #[must_use]
    pub fn add_context<C>(mut self, ctx: C) -> Self
    where
        C: Into<String>,
    {
        match self {
            Self::ArgumentInvalid { ref mut context }
            | Self::UnknownPolicy {
                ref mut context, ..
            } => context.push(ctx.into()),
        }
        self
    }
}
