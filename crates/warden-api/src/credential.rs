// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ApiError;
use std::fmt;

/// The admin secret. Lives only in memory for the session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Asks the operator for the admin secret. Blocks until answered; `None`
/// means the prompt was dismissed.
pub trait SecretPrompt: Send {
    fn prompt_secret(&mut self) -> Option<String>;
}

impl<F> SecretPrompt for F
where
    F: FnMut() -> Option<String> + Send,
{
    fn prompt_secret(&mut self) -> Option<String> {
        self()
    }
}

pub struct CredentialGuard {
    cached: Option<Credential>,
    prompt: Box<dyn SecretPrompt>,
}

impl fmt::Debug for CredentialGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialGuard")
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

impl CredentialGuard {
    pub fn new(prompt: Box<dyn SecretPrompt>) -> Self {
        Self {
            cached: None,
            prompt,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.cached.is_some()
    }

    pub fn ensure(&mut self) -> Result<Credential, ApiError> {
        if let Some(credential) = &self.cached {
            return Ok(credential.clone());
        }

        let answer = self.prompt.prompt_secret().unwrap_or_default();
        let credential = Credential::new(&answer)
            .ok_or_else(|| ApiError::Auth("no admin secret entered".to_owned()))?;
        self.cached = Some(credential.clone());
        Ok(credential)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Clears the cache only if it still holds `rejected`. A request that
    /// raced a fresh prompt must not discard the newer secret.
    pub fn invalidate_if(&mut self, rejected: &Credential) -> bool {
        if self.cached.as_ref() == Some(rejected) {
            self.cached = None;
            return true;
        }
        false
    }
}
