use rand::Rng;

pub const REFERRAL_CODE_LENGTH: usize = 8;
pub const ONE_TIME_PASSWORD_LENGTH: usize = 16;

const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ONE_TIME_PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

fn sample(alphabet: &'static [u8], length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Mints a shareable referral code. Uniqueness is owned by the database
/// constraint; callers retry with a fresh code on collision.
pub fn generate_referral_code() -> String {
    sample(REFERRAL_CODE_ALPHABET, REFERRAL_CODE_LENGTH)
}

/// Mints an initial password for bulk-imported accounts. Wider alphabet
/// than referral codes; these are handed out once and rotated on first
/// login by the identity provider.
pub fn generate_one_time_password() -> String {
    sample(ONE_TIME_PASSWORD_ALPHABET, ONE_TIME_PASSWORD_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_code_shape() {
        for _ in 0..100 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LENGTH);
            assert!(code.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b)), "bad code: {}", code);
        }
    }

    #[test]
    fn one_time_password_shape() {
        for _ in 0..100 {
            let password = generate_one_time_password();
            assert_eq!(password.len(), ONE_TIME_PASSWORD_LENGTH);
            assert!(password.bytes().all(|b| ONE_TIME_PASSWORD_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn codes_are_not_constant() {
        let codes: std::collections::HashSet<String> = (0..50).map(|_| generate_referral_code()).collect();
        assert!(codes.len() > 1);
    }
}
