use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

pub const OTP_LENGTH: usize = 6;
const RESET_TOKEN_LENGTH: usize = 48;

pub struct OneTimeCodes;

impl OneTimeCodes {
    /// Six random decimal digits, leading zeros allowed.
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..OTP_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    pub fn generate_reset_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Codes and reset tokens are only ever stored as digests.
    pub fn digest(value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_well_formed_code(code: &str) -> bool {
        let code = code.trim();
        code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit())
    }
}
