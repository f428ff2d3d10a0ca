//! Token and key helpers: JWT signing/validation over free-form claims,
//! RSA key material in PEM, and random string generation.

mod jwt;
mod keys;
mod random;

pub use jwt::{
    generate_hs256, generate_rs256, validate_hs256, validate_rs256, Claims, TokenError,
};
pub use keys::{generate_rsa_keypair_pem, parse_public_key_pem, KeyError, RSA_KEY_BITS};
pub use random::random_string;
