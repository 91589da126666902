use accord_core::{Party, PartyKey, PartyName, Signature, Transaction, TxId};
use anyhow::{anyhow, Context};
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

use crate::collaborators::Signer;

/// ed25519 credential of one party.
pub struct KeyPairSigner {
    party: Party,
    key: SigningKey,
}

impl KeyPairSigner {
    pub fn generate(name: PartyName) -> Self {
        Self::from_key(name, SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(name: PartyName, seed: &[u8; 32]) -> Self {
        Self::from_key(name, SigningKey::from_bytes(seed))
    }

    pub fn from_seed_hex(name: PartyName, seed_hex: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(seed_hex.trim()).context("decode key seed hex")?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow!("key seed must be 32 bytes, got {}", bytes.len()))?;
        Ok(Self::from_seed(name, &seed))
    }

    fn from_key(name: PartyName, key: SigningKey) -> Self {
        let owning_key = PartyKey::from_bytes(key.verifying_key().as_bytes());
        Self {
            party: Party::new(name, owning_key),
            key,
        }
    }

    pub fn seed_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }
}

impl Signer for KeyPairSigner {
    fn identity(&self) -> &Party {
        &self.party
    }

    fn sign(&self, tx: &Transaction) -> Signature {
        let sig = self.key.sign(tx.id.as_str().as_bytes());
        Signature {
            by: self.party.owning_key.clone(),
            bytes: hex::encode(sig.to_bytes()),
        }
    }
}

/// True when `sig` is a valid signature by `sig.by` over `tx_id`.
pub fn verify_signature(sig: &Signature, tx_id: &TxId) -> bool {
    let Some(key) = decode_key(&sig.by) else {
        return false;
    };
    let Ok(bytes) = hex::decode(&sig.bytes) else {
        return false;
    };
    let Ok(sig) = ed25519_dalek::Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(tx_id.as_str().as_bytes(), &sig).is_ok()
}

fn decode_key(key: &PartyKey) -> Option<VerifyingKey> {
    let bytes = hex::decode(key.as_str()).ok()?;
    let arr: [u8; 32] = bytes.as_slice().try_into().ok()?;
    VerifyingKey::from_bytes(&arr).ok()
}
