// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Anti-forgery `state` values for authorization requests

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::AuthError;

/// Entropy of a state value in bytes
pub const STATE_BYTES: usize = 32;

/// Length of an encoded state value (standard base64 with padding)
pub const STATE_LEN: usize = 44;

/// Draw a fresh state from the operating system CSPRNG
///
/// The 32 random bytes are encoded with the standard base64 alphabet, so the
/// value may contain `+`, `/` and `=` and must be URL-encoded in query strings.
pub fn generate_state() -> Result<String, AuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::StateGeneration(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Compare a callback state with the stored one without early exit
pub fn state_matches(received: &str, stored: &str) -> bool {
    let (received, stored) = (received.as_bytes(), stored.as_bytes());
    received.len() == stored.len()
        && received
            .iter()
            .zip(stored)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
