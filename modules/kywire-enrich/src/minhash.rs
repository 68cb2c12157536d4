//! MinHash signatures for near-duplicate detection.
//!
//! 16 FNV-1a-style hash functions, each seeded with a distinct offset
//! basis; a signature is the per-hash minimum over the token set. The
//! Jaccard estimate between two signatures is the fraction of matching
//! positions, an unbiased estimator of set Jaccard.

use std::collections::BTreeSet;

/// Number of hash functions / signature positions.
pub const SIGNATURE_LEN: usize = 16;

/// How much of the summary joins the title in the token set.
const SUMMARY_PREFIX_CHARS: usize = 200;

/// Tokens this short carry no signal.
const MIN_TOKEN_LEN: usize = 3;

/// Jaccard estimate at or above this marks a duplicate.
pub const DUPLICATE_THRESHOLD: f64 = 0.72;

/// Distinct offset bases: the FNV-1a 32-bit basis perturbed by multiples
/// of the golden-ratio constant. Stable across releases — stored
/// signatures must keep comparing.
const SEEDS: [u32; SIGNATURE_LEN] = {
    let mut seeds = [0u32; SIGNATURE_LEN];
    let mut i = 0;
    while i < SIGNATURE_LEN {
        seeds[i] = 0x811c9dc5 ^ (i as u32).wrapping_mul(0x9e3779b9);
        i += 1;
    }
    seeds
};

const FNV_PRIME_32: u32 = 0x01000193;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "from", "have", "has", "had",
    "was", "were", "are", "but", "not", "you", "his", "her", "its", "they",
    "them", "their", "will", "would", "been", "after", "before", "over",
    "into", "about", "more", "than", "when", "where", "what", "who", "why",
    "how", "all", "any", "can", "could", "should", "may", "says", "said",
    "out", "our", "your", "new",
];

/// Tokenize `title` plus the first 200 chars of `summary`: lowercase,
/// alphanumeric runs only, short tokens and stopwords dropped.
fn tokenize(title: &str, summary: Option<&str>) -> BTreeSet<String> {
    let mut text = title.to_string();
    if let Some(s) = summary {
        text.push(' ');
        text.extend(s.chars().take(SUMMARY_PREFIX_CHARS));
    }

    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                current.push(lc);
            }
        } else if !current.is_empty() {
            push_token(&mut tokens, std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, current);
    }
    tokens
}

fn push_token(tokens: &mut BTreeSet<String>, token: String) {
    if token.len() >= MIN_TOKEN_LEN && !STOPWORDS.contains(&token.as_str()) {
        tokens.insert(token);
    }
}

fn seeded_fnv1a(seed: u32, token: &str) -> u32 {
    let mut hash = seed;
    for byte in token.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME_32);
    }
    hash
}

/// Compute the 16-position MinHash signature for an item. Returns `None`
/// when tokenization yields nothing to hash (empty or all-stopword text).
pub fn minhash_signature(title: &str, summary: Option<&str>) -> Option<[u32; SIGNATURE_LEN]> {
    let tokens = tokenize(title, summary);
    if tokens.is_empty() {
        return None;
    }

    let mut signature = [u32::MAX; SIGNATURE_LEN];
    for token in &tokens {
        for (i, seed) in SEEDS.iter().enumerate() {
            let h = seeded_fnv1a(*seed, token);
            if h < signature[i] {
                signature[i] = h;
            }
        }
    }
    Some(signature)
}

/// Encode a signature as 128 hex chars (16 × 8).
pub fn encode_signature(signature: &[u32; SIGNATURE_LEN]) -> String {
    let mut out = String::with_capacity(SIGNATURE_LEN * 8);
    for value in signature {
        out.push_str(&format!("{value:08x}"));
    }
    out
}

/// Decode a 128-hex-char signature. Returns `None` on malformed input.
pub fn decode_signature(encoded: &str) -> Option<[u32; SIGNATURE_LEN]> {
    if encoded.len() != SIGNATURE_LEN * 8 {
        return None;
    }
    let mut signature = [0u32; SIGNATURE_LEN];
    for (i, chunk) in signature.iter_mut().enumerate() {
        let slice = &encoded[i * 8..(i + 1) * 8];
        *chunk = u32::from_str_radix(slice, 16).ok()?;
    }
    Some(signature)
}

/// Fraction of matching signature positions.
pub fn jaccard_estimate(a: &[u32; SIGNATURE_LEN], b: &[u32; SIGNATURE_LEN]) -> f64 {
    let matches = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    matches as f64 / SIGNATURE_LEN as f64
}
