//! Deterministic word-hashing tokenizer with BERT-style special ids.

use super::sources::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const CLS_ID: u32 = 2;
pub const SEP_ID: u32 = 3;
const RESERVED: u32 = 4;

pub const PAD_TOKEN: &str = "[PAD]";

/// bert-base-uncased vocabulary size
pub const DEFAULT_VOCAB_SIZE: usize = 30_522;

/// Pre-pad or pre-truncate `ids` to exactly `max_len`
pub fn pad_sequence(ids: &[u32], max_len: usize, pad: u32) -> Vec<u32> {
    if ids.len() >= max_len {
        return ids[ids.len() - max_len..].to_vec();
    }
    let mut out = vec![pad; max_len - ids.len()];
    out.extend_from_slice(ids);
    out
}

fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Maps each lower-cased word to a bucket in `[4, vocab_size)`
#[derive(Debug, Clone)]
pub struct HashingTokenizer {
    vocab_size: usize,
}

impl HashingTokenizer {
    /// `vocab_size` is clamped so at least one word bucket exists
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size: vocab_size.max(RESERVED as usize + 1),
        }
    }

    fn word_id(&self, word: &str) -> u32 {
        let buckets = self.vocab_size as u64 - u64::from(RESERVED);
        RESERVED + (fnv1a(word) % buckets) as u32
    }
}

impl Default for HashingTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_VOCAB_SIZE)
    }
}

impl Tokenizer for HashingTokenizer {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn pad_id(&self) -> u32 {
        PAD_ID
    }

    fn pad_token(&self) -> &str {
        PAD_TOKEN
    }

    fn encode(&self, text: &str, max_len: usize) -> Vec<u32> {
        if text.trim() == PAD_TOKEN {
            return vec![PAD_ID; max_len];
        }

        let lowered = text.to_lowercase();
        let mut ids = vec![CLS_ID];
        ids.extend(
            lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(|w| self.word_id(w)),
        );
        ids.push(SEP_ID);
        pad_sequence(&ids, max_len, PAD_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_sequence_pre_pads_and_pre_truncates() {
        assert_eq!(pad_sequence(&[7, 8], 4, 0), vec![0, 0, 7, 8]);
        assert_eq!(pad_sequence(&[1, 2, 3, 4, 5], 3, 0), vec![3, 4, 5]);
        assert_eq!(pad_sequence(&[], 2, 9), vec![9, 9]);
        assert!(pad_sequence(&[1], 0, 0).is_empty());
    }

    #[test]
    fn test_encode_is_deterministic_and_bounded() {
        let tok = HashingTokenizer::new(1000);
        let a = tok.encode("Apple beats Q3 estimates!", 10);
        let b = tok.encode("apple BEATS q3 estimates", 10);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert_eq!(&a[..4], &[PAD_ID; 4]);
        assert_eq!(a[4], CLS_ID);
        assert_eq!(a[9], SEP_ID);
        assert!(a.iter().all(|&id| (id as usize) < 1000));
    }

    #[test]
    fn test_pad_token_encodes_to_all_pad() {
        let tok = HashingTokenizer::default();
        assert_eq!(tok.encode(tok.pad_token(), 512), vec![PAD_ID; 512]);
    }

    #[test]
    fn test_long_text_keeps_tail() {
        let tok = HashingTokenizer::new(50);
        let text = (0..200).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let ids = tok.encode(&text, 5);
        assert_eq!(ids.len(), 5);
        assert_eq!(*ids.last().unwrap(), SEP_ID);
        assert_eq!(ids[3], tok.word_id("w199"));
    }
}
