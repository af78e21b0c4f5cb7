use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Verifier;
use tracing::{error, warn};

/// Verifies that `signed_data` was signed with the private key counterpart of
/// `base64_public_key`, using the vendor's published scheme (RSA with SHA-1
/// over the raw payload bytes, key as base64 DER SubjectPublicKeyInfo,
/// signature base64). Malformed inputs are logged and reported as a failed
/// verification rather than an error.
pub fn verify_purchase(base64_public_key: &str, signed_data: &str, signature: &str) -> bool {
    if base64_public_key.is_empty() || signed_data.is_empty() || signature.is_empty() {
        warn!("purchase verification failed: missing key, data, or signature");
        return false;
    }

    let key_der = match BASE64.decode(base64_public_key) {
        Ok(der) => der,
        Err(err) => {
            error!(%err, "invalid base64 public key");
            return false;
        }
    };
    let public_key = match PKey::public_key_from_der(&key_der) {
        Ok(key) => key,
        Err(err) => {
            error!(%err, "invalid public key");
            return false;
        }
    };
    let signature_bytes = match BASE64.decode(signature) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(%err, "base64 decoding of signature failed");
            return false;
        }
    };

    let verified = Verifier::new(MessageDigest::sha1(), &public_key)
        .and_then(|mut verifier| {
            verifier.update(signed_data.as_bytes())?;
            verifier.verify(&signature_bytes)
        })
        .unwrap_or_else(|err| {
            error!(%err, "signature verification errored");
            false
        });
    if !verified {
        warn!("signature verification failed");
    }
    verified
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::rsa::Rsa;
    use openssl::sign::Signer;

    fn generated_key_and_signature(data: &str) -> (String, String) {
        let rsa = Rsa::generate(2048).unwrap();
        let pkey = PKey::from_rsa(rsa).unwrap();
        let mut signer = Signer::new(MessageDigest::sha1(), &pkey).unwrap();
        signer.update(data.as_bytes()).unwrap();
        let signature = signer.sign_to_vec().unwrap();
        let public_der = pkey.public_key_to_der().unwrap();
        (BASE64.encode(public_der), BASE64.encode(signature))
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = r#"{"productId":"coin_100","purchaseState":0}"#;
        let (key, signature) = generated_key_and_signature(payload);
        assert!(verify_purchase(&key, payload, &signature));
    }

    #[test]
    fn rejects_tampered_data() {
        let payload = r#"{"productId":"coin_100","purchaseState":0}"#;
        let (key, signature) = generated_key_and_signature(payload);
        let tampered = r#"{"productId":"coin_9999","purchaseState":0}"#;
        assert!(!verify_purchase(&key, tampered, &signature));
    }

    #[test]
    fn rejects_signature_from_another_key() {
        let payload = r#"{"productId":"coin_100"}"#;
        let (key, _) = generated_key_and_signature(payload);
        let (_, other_signature) = generated_key_and_signature(payload);
        assert!(!verify_purchase(&key, payload, &other_signature));
    }

    #[test]
    fn rejects_empty_or_malformed_inputs() {
        assert!(!verify_purchase("", "data", "sig"));
        assert!(!verify_purchase("key", "", "sig"));
        assert!(!verify_purchase("key", "data", ""));
        assert!(!verify_purchase("!!not-base64!!", "data", "c2ln"));
        assert!(!verify_purchase("c2ln", "data", "!!not-base64!!"));
    }
}
