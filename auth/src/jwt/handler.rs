use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::TokenError;

/// JWT codec for access tokens.
///
/// Uses HS256 (HMAC with SHA-256). Expiry is checked with zero leeway so that a
/// token is rejected as soon as its `exp` has passed.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Encode claims into a signed JWT.
    ///
    /// # Errors
    /// * `Signing` - Token encoding failed
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Decode a JWT, validating its signature and expiry.
    ///
    /// # Errors
    /// * `Expired` - `exp` is in the past
    /// * `InvalidSignature` - Signature does not match the key
    /// * `Malformed` - Token structure or claims are invalid
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, self.validation())
    }

    /// Decode a JWT, validating its signature but not its expiry.
    ///
    /// Only for flows that must act on tokens which are past their lifetime,
    /// such as revoking a session.
    pub fn decode_allow_expired(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        self.decode_with(token, validation)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }

    fn decode_with(&self, token: &str, validation: Validation) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}
