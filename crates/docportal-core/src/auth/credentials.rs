use anyhow::{Context, Result};
use keyring::Entry;

use super::session::{CredentialPair, TokenStore};

const SERVICE_NAME: &str = "docportal";

/// Keychain account holding the serialized credential pair
const TOKEN_ACCOUNT: &str = "token";

/// Stores the credential pair as one JSON secret in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            account: TOKEN_ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let pair = serde_json::from_str(&secret)
                    .context("Failed to parse token from keychain")?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let secret = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store token in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
