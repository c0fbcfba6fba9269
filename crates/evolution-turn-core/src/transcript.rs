use blake3::Hasher;

/// Length of a hex-encoded BLAKE3 digest.
pub const TRANSCRIPT_HASH_LEN: usize = 64;

/// Hash an AI-chat transcript into the form proposals carry.
pub fn hash_transcript(transcript: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(transcript.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub fn is_well_formed_transcript_hash(hash: &str) -> bool {
    hash.len() == TRANSCRIPT_HASH_LEN
        && hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_well_formed_and_stable() {
        let a = hash_transcript("user: start micro-epoch visual focus");
        let b = hash_transcript("user: start micro-epoch visual focus");
        assert_eq!(a, b);
        assert!(is_well_formed_transcript_hash(&a));
        assert_ne!(a, hash_transcript("user: start micro-epoch haptic guidance"));
    }

    #[test]
    fn rejects_malformed_hashes() {
        let good = hash_transcript("t");
        assert!(!is_well_formed_transcript_hash(""));
        assert!(!is_well_formed_transcript_hash(&good[..63]));
        assert!(!is_well_formed_transcript_hash(&good.to_uppercase()));
        assert!(!is_well_formed_transcript_hash(&format!("0x{}", &good[2..])));
    }
}
