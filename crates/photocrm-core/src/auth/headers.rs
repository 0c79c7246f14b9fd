use std::sync::RwLock;

/// The default `Authorization: Bearer <token>` applied to outbound calls.
///
/// Only `SessionStore` writes it; the gateway reads it before every send.
#[derive(Debug, Default)]
pub struct DefaultHeaders {
    bearer: RwLock<Option<String>>,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token currently installed, if any.
    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set_bearer(&self, token: &str) {
        *self.bearer.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
    }

    pub(crate) fn clear(&self) {
        *self.bearer.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
