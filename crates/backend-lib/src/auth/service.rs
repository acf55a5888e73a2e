use async_trait::async_trait;

use super::{Credentials, Token};
use crate::error::AuthError;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify `credentials` and issue a token for the account
    async fn login(&self, credentials: Credentials) -> Result<Token, AuthError>;
    /// Whether tokens can currently be signed
    fn health(&self) -> Result<(), AuthError>;
}
