use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

pub const VERIFICATION_TOKEN_LENGTH: usize = 48;

/// Single-use email verification tokens. The raw token only travels in the
/// emailed link; the database keeps its SHA-256 digest.
pub struct VerificationTokenService;

impl VerificationTokenService {
    pub fn generate_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(VERIFICATION_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cheap shape check so obviously bogus links never reach the database.
    pub fn is_well_formed(token: &str) -> bool {
        token.len() == VERIFICATION_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
    }

    pub fn verification_link(public_base_url: &str, token: &str) -> String {
        format!("{}/api/user/verify/{}", public_base_url, token)
    }
}
