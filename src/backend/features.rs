//! Text featurisation
//!
//! Maps an utterance to a fixed-width, L2-normalised bag of hashed unigrams
//! and bigrams. The hash is FNV-1a so vectors are stable across builds and
//! platforms, which the stored weight files rely on.

use crate::utils::math::l2_normalize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            // Separator so ("ab", "c") and ("a", "bc") differ
            hash ^= 0x1f;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for byte in part.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Lowercased word tokens; terminal punctuation is kept as its own token
/// since it is a strong end-of-turn cue.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '\'' {
            current.extend(ch.to_lowercase());
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            if matches!(ch, '.' | '?' | '!') {
                tokens.push(ch.to_string());
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Hashed feature vector of width `buckets`
pub fn hash_features(text: &str, buckets: usize) -> Vec<f32> {
    let mut features = vec![0.0f32; buckets];
    if buckets == 0 {
        return features;
    }

    let tokens = tokenize(text);
    let bucket = |h: u64| (h % buckets as u64) as usize;

    for token in &tokens {
        features[bucket(fnv1a(&["u", token.as_str()]))] += 1.0;
    }
    for pair in tokens.windows(2) {
        features[bucket(fnv1a(&["b", pair[0].as_str(), pair[1].as_str()]))] += 1.0;
    }
    if let Some(last) = tokens.last() {
        features[bucket(fnv1a(&["last", last.as_str()]))] += 1.0;
    }

    l2_normalize(&mut features);
    features
}
