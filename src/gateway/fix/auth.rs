use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};

use crate::gateway::fix::message::CompIds;

const PKCS8_LENGTH: usize = 48;
const PKCS8_KEY_OFFSET: usize = 16;

/// Decodes an Ed25519 key given either raw (32 bytes) or PKCS#8 DER
/// (48 bytes), base64 encoded.
pub fn load_signing_key(key_b64: &str) -> anyhow::Result<SigningKey> {
    let key_bytes = general_purpose::STANDARD
        .decode(key_b64.trim())
        .context("private key is not valid base64")?;

    let secret: &[u8] = if key_bytes.len() == PKCS8_LENGTH && key_bytes[0] == 0x30 {
        &key_bytes[PKCS8_KEY_OFFSET..]
    } else if key_bytes.len() == SECRET_KEY_LENGTH {
        &key_bytes
    } else {
        anyhow::bail!("Invalid Ed25519 private key format ({} bytes)", key_bytes.len());
    };

    Ok(SigningKey::from_bytes(secret.try_into()?))
}

/// Base64 signature for the Logon RawData field.
pub fn logon_raw_data(
    key: &SigningKey,
    comp_ids: &CompIds,
    seq_num: u64,
    sending_time: &str,
) -> String {
    let payload = format!(
        "A\x01{}\x01{}\x01{}\x01{}",
        comp_ids.sender, comp_ids.target, seq_num, sending_time
    );
    let signature = key.sign(payload.as_bytes());
    general_purpose::STANDARD.encode(signature.to_bytes())
}
