//! Wallet-signature authentication.
//!
//! # Responsibilities
//! - Build the sign-in message embedding a server-issued nonce
//! - Recover the signing address from (message, signature) via EIP-191
//! - Consume the nonce atomically, defeating replay of valid signatures
//! - Create or load the account and issue a session
//!
//! The nonce is consumed even when the signature alone would verify: a
//! well-formed, previously-used message must never authenticate twice.

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::Signature;
use thiserror::Error;

use crate::accounts::AccountStore;
use crate::auth::nonce::{IssuedNonce, NonceRegistry};
use crate::auth::session::{Session, SessionStore};

/// Authentication failure modes.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Recovered signer does not equal the claimed address.
    #[error("Signature does not match the claimed address")]
    SignatureMismatch,

    /// Nonce is expired, already consumed, or was never issued.
    #[error("Nonce is expired, already consumed, or unknown")]
    NonceInvalid,

    /// Message or signature is not in the expected shape.
    #[error("Malformed sign-in message: {0}")]
    MalformedMessage(String),
}

/// Verifies signed challenges and establishes sessions.
pub struct WalletAuthenticator {
    domain: String,
    nonces: Arc<NonceRegistry>,
    accounts: Arc<AccountStore>,
    sessions: Arc<SessionStore>,
}

impl WalletAuthenticator {
    pub fn new(
        domain: String,
        nonces: Arc<NonceRegistry>,
        accounts: Arc<AccountStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            domain,
            nonces,
            accounts,
            sessions,
        }
    }

    /// Issue a nonce and build the message the wallet must sign.
    pub fn challenge(&self, address: Address) -> (IssuedNonce, String) {
        let nonce = self.nonces.issue(address);
        let message = self.login_message(address, &nonce);
        (nonce, message)
    }

    /// The sign-in message for an issued nonce.
    pub fn login_message(&self, address: Address, nonce: &IssuedNonce) -> String {
        format!(
            "{domain} wants you to sign in with your wallet:\n\
             {address}\n\
             \n\
             Nonce: {value}\n\
             Issued At: {issued_at}\n\
             Expires At: {expires_at}",
            domain = self.domain,
            address = address,
            value = nonce.value,
            issued_at = nonce.issued_at,
            expires_at = nonce.expires_at,
        )
    }

    /// Verify a signed challenge and establish a session.
    pub fn verify(
        &self,
        claimed: &str,
        message: &str,
        signature: &str,
    ) -> Result<Session, AuthError> {
        let claimed_address: Address = claimed
            .parse()
            .map_err(|_| AuthError::MalformedMessage("invalid wallet address".to_string()))?;

        let (message_address, nonce_value) = parse_message(message)?;
        if message_address != claimed_address {
            return Err(AuthError::MalformedMessage(
                "message is not addressed to the claimed wallet".to_string(),
            ));
        }

        let signature: Signature = signature
            .parse()
            .map_err(|_| AuthError::MalformedMessage("signature is not 65-byte hex".to_string()))?;

        // EIP-191 personal-message recovery; address equality is byte
        // equality, which already normalizes checksum casing.
        let recovered = signature
            .recover_address_from_msg(message.as_bytes())
            .map_err(|_| AuthError::SignatureMismatch)?;
        if recovered != claimed_address {
            tracing::debug!(
                claimed = %claimed_address,
                recovered = %recovered,
                "Signature recovery mismatch"
            );
            return Err(AuthError::SignatureMismatch);
        }

        // Consume last: a failed consume invalidates an otherwise valid
        // signature, which is exactly what defeats replay.
        if !self.nonces.consume(&claimed_address, &nonce_value) {
            return Err(AuthError::NonceInvalid);
        }

        let account = self.accounts.get_or_create(claimed_address);
        let session = self.sessions.create(&account);
        tracing::info!(
            account_id = %account.id,
            address = %claimed_address,
            "Wallet authenticated"
        );
        Ok(session)
    }
}

/// Extract the wallet address and nonce from a sign-in message.
fn parse_message(message: &str) -> Result<(Address, String), AuthError> {
    let mut lines = message.lines();
    let _header = lines
        .next()
        .filter(|line| line.ends_with("wants you to sign in with your wallet:"))
        .ok_or_else(|| AuthError::MalformedMessage("missing sign-in header".to_string()))?;

    let address: Address = lines
        .next()
        .and_then(|line| line.trim().parse().ok())
        .ok_or_else(|| AuthError::MalformedMessage("missing wallet address".to_string()))?;

    let nonce = lines
        .find_map(|line| line.strip_prefix("Nonce: "))
        .ok_or_else(|| AuthError::MalformedMessage("missing nonce".to_string()))?;
    if nonce.is_empty() {
        return Err(AuthError::MalformedMessage("empty nonce".to_string()));
    }

    Ok((address, nonce.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_authenticator() -> (WalletAuthenticator, PrivateKeySigner) {
        let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().unwrap();
        let authenticator = WalletAuthenticator::new(
            "inkgate.test".to_string(),
            Arc::new(NonceRegistry::new(300)),
            Arc::new(AccountStore::new(None)),
            Arc::new(SessionStore::new(3600)),
        );
        (authenticator, signer)
    }

    fn sign(signer: &PrivateKeySigner, message: &str) -> String {
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
        format!("0x{}", alloy::hex::encode(signature.as_bytes()))
    }

    #[test]
    fn test_happy_path() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (_, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);

        let session = authenticator
            .verify(&address.to_string(), &message, &signature)
            .unwrap();
        assert_eq!(session.address, address);
    }

    #[test]
    fn test_lowercase_address_accepted() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (_, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);

        let claimed = address.to_string().to_lowercase();
        assert!(authenticator.verify(&claimed, &message, &signature).is_ok());
    }

    #[test]
    fn test_replay_rejected() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (_, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);
        let claimed = address.to_string();

        assert!(authenticator.verify(&claimed, &message, &signature).is_ok());
        // Identical, still well-formed message fails on nonce consumption
        let replay = authenticator.verify(&claimed, &message, &signature);
        assert!(matches!(replay, Err(AuthError::NonceInvalid)));
    }

    #[test]
    fn test_wrong_claimed_address() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (_, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);

        // Message embeds the signer address, claim someone else's wallet
        let other = Address::repeat_byte(0x42).to_string();
        let result = authenticator.verify(&other, &message, &signature);
        assert!(matches!(result, Err(AuthError::MalformedMessage(_))));
    }

    #[test]
    fn test_signature_from_other_key() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (_, message) = authenticator.challenge(address);
        let other_signer = PrivateKeySigner::random();
        let signature = sign(&other_signer, &message);

        let result = authenticator.verify(&address.to_string(), &message, &signature);
        assert!(matches!(result, Err(AuthError::SignatureMismatch)));
    }

    #[test]
    fn test_malformed_inputs() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();
        let (_, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);
        let claimed = address.to_string();

        assert!(matches!(
            authenticator.verify("0xnope", &message, &signature),
            Err(AuthError::MalformedMessage(_))
        ));
        assert!(matches!(
            authenticator.verify(&claimed, "not a login message", &signature),
            Err(AuthError::MalformedMessage(_))
        ));
        assert!(matches!(
            authenticator.verify(&claimed, &message, "0x1234"),
            Err(AuthError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_tampered_message_fails() {
        let (authenticator, signer) = test_authenticator();
        let address = signer.address();

        let (nonce, message) = authenticator.challenge(address);
        let signature = sign(&signer, &message);

        // Swap the signed nonce for a different value; recovery then yields
        // a different address than the claim
        let tampered = message.replace(&nonce.value, "deadbeef");
        let result = authenticator.verify(&address.to_string(), &tampered, &signature);
        assert!(matches!(result, Err(AuthError::SignatureMismatch)));
    }
}
