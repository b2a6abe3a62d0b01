//! Token command implementation.

use habitsync_server::{ServerConfig, TokenAuthenticator};
use uuid::Uuid;

/// Runs the token command.
pub fn run(secret: &[u8], user: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let token = mint(secret, user)?;
    println!("{token}");
    Ok(())
}

/// Mints a token for `user` with the default lifetime.
pub fn mint(secret: &[u8], user: Uuid) -> Result<String, Box<dyn std::error::Error>> {
    let auth = TokenAuthenticator::new(secret, ServerConfig::default().token_expiry);
    tracing::debug!(user = %user, expiry = ?auth.expiry(), "minting token");
    Ok(auth.issue(user)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitsync_server::Authenticator;

    #[test]
    fn minted_token_authenticates() {
        let user = Uuid::new_v4();
        let token = mint(b"cli-secret", user).unwrap();

        let auth = TokenAuthenticator::new(b"cli-secret".to_vec(), ServerConfig::default().token_expiry);
        assert_eq!(auth.authenticate(&token).unwrap(), user);
    }
}
