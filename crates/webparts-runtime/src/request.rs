//! Request context seen by the personalization engine.

#![allow(missing_docs)]

use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

/// The parts of an incoming request that personalization depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: RequestMethod,
    /// Page path the personalization blobs are keyed by.
    pub path: SmolStr,
    /// Authenticated user name, if any.
    pub user: Option<SmolStr>,
    /// Culture used for connection point display names.
    pub culture: SmolStr,
}

impl RequestContext {
    #[must_use]
    pub fn get(path: impl Into<SmolStr>) -> Self {
        Self::new(RequestMethod::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<SmolStr>) -> Self {
        Self::new(RequestMethod::Post, path)
    }

    fn new(method: RequestMethod, path: impl Into<SmolStr>) -> Self {
        Self {
            method,
            path: path.into(),
            user: None,
            culture: SmolStr::new_inline("en"),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<SmolStr>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_culture(mut self, culture: impl Into<SmolStr>) -> Self {
        self.culture = culture.into();
        self
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        matches!(self.method, RequestMethod::Post)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.as_ref().is_some_and(|user| !user.is_empty())
    }
}
