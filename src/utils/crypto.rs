use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// `sha256=<hex>` signature of `body`, as sent in `X-Signature`.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn secrets_match(provided: &str, expected: &str) -> bool {
    ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_and_key_dependent() {
        let body = br#"{"applicationId":1}"#;
        let a = sign_payload("secret-a", body);
        assert!(a.starts_with("sha256="));
        assert_eq!(a.len(), "sha256=".len() + 64);
        assert_eq!(a, sign_payload("secret-a", body));
        assert_ne!(a, sign_payload("secret-b", body));
    }

    #[test]
    fn secrets_compare_exactly() {
        assert!(secrets_match("whsec_1", "whsec_1"));
        assert!(!secrets_match("whsec_1", "whsec_2"));
        assert!(!secrets_match("whsec", "whsec_1"));
    }
}
