use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::types::push::VapidConfig;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub enum VapidConfigStatus {
    Missing,
    Incomplete(Vec<&'static str>),
    Ready(VapidConfig),
}

pub fn load_vapid_config(
    contact: Option<&str>,
    public_key: Option<&str>,
    private_key: Option<&str>,
) -> VapidConfigStatus {
    let contact = contact.map(str::trim).filter(|value| !value.is_empty());
    let public_key = public_key.map(str::trim).filter(|value| !value.is_empty());
    let private_key = private_key.map(str::trim).filter(|value| !value.is_empty());

    match (contact, public_key, private_key) {
        (Some(contact), Some(public_key), Some(private_key)) => {
            VapidConfigStatus::Ready(VapidConfig {
                contact: contact.to_string(),
                public_key: public_key.to_string(),
                private_key: private_key.to_string(),
            })
        }
        (None, None, None) => VapidConfigStatus::Missing,
        (contact, public_key, private_key) => {
            let mut missing = Vec::new();
            if contact.is_none() {
                missing.push("contact");
            }
            if public_key.is_none() {
                missing.push("public key");
            }
            if private_key.is_none() {
                missing.push("private key");
            }
            VapidConfigStatus::Incomplete(missing)
        }
    }
}

/// Checks that the configured public key belongs to the private key, so a
/// bad pair fails at startup instead of on every delivery.
pub fn verify_key_pair(vapid: &VapidConfig) -> Result<(), String> {
    let derived =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&vapid.private_key, URL_SAFE_NO_PAD)
            .map_err(|err| format!("invalid VAPID private key: {err}"))?
            .get_public_key();
    let derived = encode_config(derived, URL_SAFE_NO_PAD);
    if derived != vapid.public_key.trim_end_matches('=') {
        return Err("VAPID public key does not match the private key".to_string());
    }
    Ok(())
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    let key_pair = generate_es256_keypair_with_rng(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    let public_key = encode_config(public_key, URL_SAFE_NO_PAD);

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

fn generate_es256_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}
