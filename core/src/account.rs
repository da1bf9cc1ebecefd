/*
 * account.rs
 * Copyright (C) 2026 oaproxy contributors
 *
 * This file is part of oaproxy, a local authenticating SMTP/IMAP proxy.
 *
 * oaproxy is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * oaproxy is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with oaproxy.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Account provider abstraction. The actual OAuth2 authorization-code
//! exchange, token cache and refresh logic live entirely outside this
//! crate; a mediator only ever sees the two operations below.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Opaque handle to a located account. The mediator never inspects its
/// contents; it only ever passes it back to [`AccountProvider::token`].
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
}

/// Failure modes of token acquisition, distinct from [`crate::error::MediatorError`]
/// because every one of them is locally recoverable: the mediator converts
/// it into a protocol-level denial and keeps the session open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No account exists for the presented username.
    NotFound,
    /// The provider knows the account but rejects it for this protocol
    /// (e.g. disabled, scope not granted).
    CredentialRejected,
    /// The provider could not mint a token right now (network failure,
    /// refresh token expired, rate limited, ...).
    Unavailable,
}

/// External collaborator that maps a presented identity to an OAuth2
/// access token. Implementations MUST be `Send + Sync`: the same provider
/// is shared (typically via `Arc`) across every connection task.
pub trait AccountProvider: Send + Sync {
    /// Locate an account by the username presented in `AUTH PLAIN` or
    /// `LOGIN`. Returns `None` if no such account is known.
    fn find<'a>(
        &'a self,
        username: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Account>> + Send + 'a>>;

    /// Mint a fresh access token for a previously located account. Never
    /// cached by the caller: a new token is requested for every credential
    /// substitution.
    fn token<'a>(
        &'a self,
        account: &'a Account,
    ) -> Pin<Box<dyn Future<Output = Result<String, TokenError>> + Send + 'a>>;
}

/// A single provisioned user in [`InMemoryAccountProvider`].
#[derive(Debug, Clone)]
pub struct StaticAccount {
    /// Whether the provider will hand out a token for this account at all.
    pub authorized: bool,
    /// The token minted on every `token()` call. A real provider would mint
    /// a fresh bearer token per call; this one just returns a fixed string,
    /// which is enough to exercise the substitution logic end to end.
    pub access_token: String,
}

/// Reference, in-memory [`AccountProvider`] for local testing and small
/// deployments: a static map of username to [`StaticAccount`]. This is the
/// only implementation this crate ships — it does not speak to any real
/// identity provider. Production deployments supply their own
/// `AccountProvider` backed by whatever OAuth2 flow they use.
#[derive(Debug, Default)]
pub struct InMemoryAccountProvider {
    accounts: HashMap<String, StaticAccount>,
}

impl InMemoryAccountProvider {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Provision an account that token()s successfully.
    pub fn with_account(mut self, username: impl Into<String>, access_token: impl Into<String>) -> Self {
        self.accounts.insert(
            username.into(),
            StaticAccount {
                authorized: true,
                access_token: access_token.into(),
            },
        );
        self
    }

    /// Provision an account that `find()`s but whose `token()` always
    /// reports `CredentialRejected` (e.g. disabled account).
    pub fn with_unauthorized_account(mut self, username: impl Into<String>) -> Self {
        self.accounts.insert(
            username.into(),
            StaticAccount {
                authorized: false,
                access_token: String::new(),
            },
        );
        self
    }
}

impl AccountProvider for InMemoryAccountProvider {
    fn find<'a>(
        &'a self,
        username: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Account>> + Send + 'a>> {
        let found = self.accounts.contains_key(username).then(|| Account {
            username: username.to_string(),
        });
        Box::pin(async move { found })
    }

    fn token<'a>(
        &'a self,
        account: &'a Account,
    ) -> Pin<Box<dyn Future<Output = Result<String, TokenError>> + Send + 'a>> {
        let result = match self.accounts.get(&account.username) {
            None => Err(TokenError::NotFound),
            Some(a) if !a.authorized => Err(TokenError::CredentialRejected),
            Some(a) => Ok(a.access_token.clone()),
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn finds_provisioned_account() {
        let provider = InMemoryAccountProvider::new().with_account("user1@example.com", "tok1");
        let account = block_on(provider.find("user1@example.com")).unwrap();
        let token = block_on(provider.token(&account)).unwrap();
        assert_eq!(token, "tok1");
    }

    #[test]
    fn unknown_account_is_none() {
        let provider = InMemoryAccountProvider::new();
        assert!(block_on(provider.find("nobody@example.com")).is_none());
    }

    #[test]
    fn unauthorized_account_rejects_token() {
        let provider = InMemoryAccountProvider::new().with_unauthorized_account("disabled@example.com");
        let account = block_on(provider.find("disabled@example.com")).unwrap();
        let err = block_on(provider.token(&account)).unwrap_err();
        assert_eq!(err, TokenError::CredentialRejected);
    }
}
