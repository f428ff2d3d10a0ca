use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use thiserror::Error;

/// Free-form JWT claims. `exp` (and `iat` for RSA tokens) are injected at
/// signing time; everything else is up to the caller.
pub type Claims = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token or key material: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Sign `claims` with HMAC-SHA256, valid for `ttl` from now.
pub fn generate_hs256(secret: &str, ttl: Duration, mut claims: Claims) -> Result<String, TokenError> {
    claims.insert("exp".to_owned(), Value::from((Utc::now() + ttl).timestamp()));

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Validate an HS256 token and return its claims.
///
/// The algorithm is pinned: a token whose header names anything but HS256
/// is rejected before signature checking. Expiry is enforced.
pub fn validate_hs256(secret: &str, token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Sign `claims` with an RSA private key (PEM), setting the `kid` header so
/// verifiers can pick the matching public key.
pub fn generate_rs256(
    private_key_pem: &str,
    kid: &str,
    ttl: Duration,
    mut claims: Claims,
) -> Result<String, TokenError> {
    let now = Utc::now();
    claims.insert("exp".to_owned(), Value::from((now + ttl).timestamp()));
    claims.insert("iat".to_owned(), Value::from(now.timestamp()));

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());

    let token = encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?,
    )?;
    Ok(token)
}

/// Validate an RS256 token against a PEM public key and return its claims.
pub fn validate_rs256(public_key_pem: &str, token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?,
        &Validation::new(Algorithm::RS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_rsa_keypair_pem;
    use jsonwebtoken::decode_header;

    fn claims_with(key: &str, value: Value) -> Claims {
        let mut claims = Claims::new();
        claims.insert(key.to_owned(), value);
        claims
    }

    #[test]
    fn hs256_round_trip_preserves_claims() {
        let token = generate_hs256(
            "test-secret",
            Duration::minutes(5),
            claims_with("user_id", Value::from(42)),
        )
        .unwrap();

        let claims = validate_hs256("test-secret", &token).unwrap();
        assert_eq!(claims.get("user_id"), Some(&Value::from(42)));
        assert!(claims.contains_key("exp"));
    }

    #[test]
    fn hs256_rejects_wrong_secret() {
        let token =
            generate_hs256("test-secret", Duration::minutes(5), Claims::new()).unwrap();
        assert!(validate_hs256("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default clock-skew leeway.
        let token =
            generate_hs256("test-secret", Duration::minutes(-5), Claims::new()).unwrap();
        assert!(validate_hs256("test-secret", &token).is_err());
    }

    #[test]
    fn rs256_round_trip_with_kid_header() {
        let (private_pem, public_pem) = generate_rsa_keypair_pem().unwrap();

        let token = generate_rs256(
            &private_pem,
            "key-1",
            Duration::minutes(5),
            claims_with("scope", Value::from("read")),
        )
        .unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("key-1"));

        let claims = validate_rs256(&public_pem, &token).unwrap();
        assert_eq!(claims.get("scope"), Some(&Value::from("read")));
        assert!(claims.contains_key("iat"));
    }

    #[test]
    fn rs256_rejects_foreign_key() {
        let (private_pem, _) = generate_rsa_keypair_pem().unwrap();
        let (_, other_public_pem) = generate_rsa_keypair_pem().unwrap();

        let token =
            generate_rs256(&private_pem, "key-1", Duration::minutes(5), Claims::new()).unwrap();
        assert!(validate_rs256(&other_public_pem, &token).is_err());
    }
}
