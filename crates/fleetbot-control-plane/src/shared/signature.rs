use crate::shared::error::TransportError;
use chrono::{DateTime, Utc};
use ring::signature::{UnparsedPublicKey, ED25519};
use std::time::Duration;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Largest accepted distance between the signed timestamp and the local clock
pub const MAX_TIMESTAMP_SKEW: Duration = Duration::from_secs(300);

/// Checks the Ed25519 signature Discord attaches to every interaction POST.
/// The signed message is the timestamp header followed by the raw body.
/// A valid signature over a timestamp outside the allowed skew is a replay
/// and is rejected as well.
#[derive(Clone)]
pub struct SignatureVerifier {
    public_key: [u8; 32],
    max_skew: Duration,
}

impl SignatureVerifier {
    pub fn new(public_key: [u8; 32]) -> Self {
        Self {
            public_key,
            max_skew: MAX_TIMESTAMP_SKEW,
        }
    }

    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = max_skew;
        self
    }

    pub fn verify(
        &self,
        signature_hex: &str,
        timestamp: &str,
        body: &[u8],
    ) -> Result<(), TransportError> {
        self.verify_at(signature_hex, timestamp, body, Utc::now())
    }

    pub fn verify_at(
        &self,
        signature_hex: &str,
        timestamp: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), TransportError> {
        let signature = hex::decode(signature_hex)
            .map_err(|e| TransportError::InvalidSignature(format!("signature is not hex: {e}")))?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.public_key)
            .verify(&message, &signature)
            .map_err(|_| TransportError::InvalidSignature("verification failed".to_string()))?;

        let signed_at: i64 = timestamp
            .parse()
            .map_err(|_| TransportError::StaleTimestamp(format!("not a unix time: {timestamp}")))?;
        let skew = now.timestamp().abs_diff(signed_at);
        if skew > self.max_skew.as_secs() {
            return Err(TransportError::StaleTimestamp(format!(
                "{skew}s away from local clock"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    pub struct TestSigner {
        key_pair: Ed25519KeyPair,
    }

    impl TestSigner {
        pub fn generate() -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
            let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
            Self { key_pair }
        }

        pub fn public_key(&self) -> [u8; 32] {
            <[u8; 32]>::try_from(self.key_pair.public_key().as_ref()).unwrap()
        }

        pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
            let mut message = timestamp.as_bytes().to_vec();
            message.extend_from_slice(body);
            hex::encode(self.key_pair.sign(&message).as_ref())
        }
    }
}
