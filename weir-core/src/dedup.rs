//! Content fingerprinting and the duplicate index.
//!
//! Two strategies behind one interface:
//! - `Exact`: 64-bit SimHash looked up in a set; only byte-identical text
//!   collides in practice.
//! - `Near`: SimHash compared against every prior signature by Hamming
//!   distance. Linear scan is fine at crawl scale (thousands of pages); the
//!   strategy enum is the seam for swapping in a bucketed index later.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Similarity-preserving 64-bit signature over shingled word features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimHash(pub u64);

impl SimHash {
    /// Compute the signature for a text using 3-gram word shingles.
    pub fn compute(text: &str) -> Self {
        let words = text.split_whitespace().collect::<Vec<_>>();

        let mut weights = [0i32; 64];
        let mut fold = |feature_hash: u64| {
            for (bit, weight) in weights.iter_mut().enumerate() {
                if feature_hash >> bit & 1 == 1 {
                    *weight += 1;
                } else {
                    *weight -= 1;
                }
            }
        };

        if words.len() < 3 {
            for word in &words {
                fold(Self::hash_feature(word));
            }
        } else {
            for window in words.windows(3) {
                fold(Self::hash_feature(&window.join(" ")));
            }
        }

        let mut hash = 0u64;
        for (bit, weight) in weights.iter().enumerate() {
            if *weight > 0 {
                hash |= 1 << bit;
            }
        }
        SimHash(hash)
    }

    fn hash_feature(feature: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        hasher.finish()
    }

    pub fn hamming_distance(&self, other: &SimHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn is_similar(&self, other: &SimHash, max_distance: u32) -> bool {
        self.hamming_distance(other) <= max_distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Duplicate only on identical signatures
    Exact,
    /// Duplicate when any prior signature is within `max_distance` bits
    Near { max_distance: u32 },
}

impl Default for DedupStrategy {
    fn default() -> Self {
        DedupStrategy::Near { max_distance: 3 }
    }
}

/// Append-only index of fingerprints seen this crawl session.
#[derive(Debug)]
pub struct FingerprintIndex {
    strategy: DedupStrategy,
    exact: HashSet<u64>,
    signatures: Vec<SimHash>,
}

impl FingerprintIndex {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            exact: HashSet::new(),
            signatures: Vec::new(),
        }
    }

    /// Returns true when the text duplicates previously seen content.
    /// Genuinely new content has its fingerprint recorded as a side effect;
    /// duplicates are never inserted.
    pub fn is_duplicate(&mut self, text: &str) -> bool {
        let signature = SimHash::compute(text);

        if self.exact.contains(&signature.0) {
            return true;
        }

        if let DedupStrategy::Near { max_distance } = self.strategy
            && self
                .signatures
                .iter()
                .any(|prior| signature.is_similar(prior, max_distance))
        {
            return true;
        }

        self.exact.insert(signature.0);
        self.signatures.push(signature);
        false
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for FingerprintIndex {
    fn default() -> Self {
        Self::new(DedupStrategy::default())
    }
}
