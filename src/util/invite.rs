use rand::Rng;

pub const INVITE_CODE_PREFIX: &str = "CTF-";
pub const INVITE_CODE_SUFFIX_LEN: usize = 4;
pub const INVITE_CODE_LEN: usize = INVITE_CODE_PREFIX.len() + INVITE_CODE_SUFFIX_LEN;

/// Four characters over a 36-symbol alphabet is a small space; creation
/// retries up to this many times on a unique-violation before giving up.
pub const MAX_INVITE_CODE_ATTEMPTS: usize = 8;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..INVITE_CODE_SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{INVITE_CODE_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_fixed_shape() {
        for _ in 0..64 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.starts_with(INVITE_CODE_PREFIX));
            let suffix = &code[INVITE_CODE_PREFIX.len()..];
            assert!(suffix
                .bytes()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}
