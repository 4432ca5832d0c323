//! HMAC-SHA256 webhook signatures.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature of the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Notion-Signature";

const PREFIX: &str = "sha256=";

/// Signature header value for `body`: `sha256=<hex>`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes())))
}

/// Check a signature header against `body` in constant time.
///
/// Accepts `sha256=<hex>` or bare hex. A missing or malformed header is a
/// failed verification.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(header) = header.map(str::trim) else {
        return false;
    };
    let hex_part = header.strip_prefix(PREFIX).unwrap_or(header);
    let Ok(expected) = hex::decode(hex_part) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"type":"page.created","entity":{"id":"p1","type":"page"}}"#;

    #[test]
    fn signed_body_verifies() {
        let header = sign("whsec", BODY).unwrap();
        assert!(header.starts_with("sha256="));
        assert_eq!(header.len(), "sha256=".len() + 64);
        assert!(verify("whsec", BODY, Some(&header)));
    }

    #[test]
    fn bare_hex_is_accepted() {
        let header = sign("whsec", BODY).unwrap();
        let bare = header.trim_start_matches("sha256=");
        assert!(verify("whsec", BODY, Some(bare)));
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign("whsec", BODY).unwrap();
        let tampered = br#"{"type":"page.created","entity":{"id":"p2","type":"page"}}"#;
        assert!(!verify("whsec", tampered, Some(&header)));
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign("whsec", BODY).unwrap();
        assert!(!verify("other", BODY, Some(&header)));
    }

    #[test]
    fn missing_or_garbage_header_fails() {
        assert!(!verify("whsec", BODY, None));
        assert!(!verify("whsec", BODY, Some("sha256=zz")));
        assert!(!verify("whsec", BODY, Some("")));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let header = sign("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            header,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
