// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim token issuance and hashing.
//!
//! A claim token is an opaque single-use secret sent to the customer inside
//! the accept/decline links. Only its keyed HMAC-SHA256 digest is ever
//! persisted, so a leaked database cannot forge claims; the key makes the
//! digest useless without the service secret.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

const TOKEN_BYTES: usize = 32;

/// A freshly minted claim token: the raw form leaves through notification
/// links and is then dropped; the hash is what gets persisted.
pub struct MintedToken {
    pub raw: String,
    pub hash: String,
}

/// Issues and verifies claim tokens under one service-wide secret.
#[derive(Clone)]
pub struct ClaimTokens {
    secret: String,
}

impl ClaimTokens {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Mint a cryptographically random token and its digest.
    pub fn mint(&self) -> MintedToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);
        let hash = self.hash(&raw);
        MintedToken { raw, hash }
    }

    /// Digest of a presented raw token, for lookup.
    pub fn hash(&self, raw_token: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take a key of any size");
        mac.update(raw_token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
