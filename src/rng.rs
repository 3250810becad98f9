//! Deterministic PRNG and seed namespacing.
//!
//! World generation must be bit-exact reproducible from `(seed, w, h,
//! seedingVersion)` across runs and across implementations, so the
//! generator is hand-rolled rather than delegated to a library RNG:
//! a 32-bit FNV-1a string hash folds the seed key plus a namespace
//! suffix into a seed integer, and a mulberry32 stream yields uniform
//! `[0, 1)` doubles from it.

/// Version tag folded into every seed key. Bump when placement rules
/// change so old matches keep their recorded layouts.
pub const SEEDING_VERSION: &str = "v1.1";

/// 32-bit FNV-1a hash of a string.
#[must_use]
pub fn fnv1a_32(input: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Canonical seed key: the durable identity of world generation inputs.
#[must_use]
pub fn seed_key(seed: &str, width: u16, height: u16) -> String {
    format!("S:{seed}|W:{width}|H:{height}|V:{SEEDING_VERSION}")
}

/// Deterministic PRNG producing uniform `[0, 1)` doubles (mulberry32).
#[derive(Debug, Clone, Copy)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Create a new stream from a 32-bit seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a stream seeded by hashing a string.
    #[must_use]
    pub fn from_str(input: &str) -> Self {
        Self::new(fnv1a_32(input))
    }

    /// Next uniform double in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut z = self.state;
        z = (z ^ (z >> 15)).wrapping_mul(z | 1);
        z ^= z.wrapping_add((z ^ (z >> 7)).wrapping_mul(z | 61));
        f64::from(z ^ (z >> 14)) / 4_294_967_296.0
    }

    /// Next integer in `[0, max)` (0 when `max == 0`).
    pub fn next_usize(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        // floor(r * max) is exact: r < 1.0 so the product stays below max.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = (self.next_f64() * max as f64) as usize;
        idx.min(max - 1)
    }
}

/// Derive the namespaced sub-stream for one placement concern.
///
/// The three world-generation namespaces are `"resources"`, `"loot"`,
/// and `"spawn"`; all hang off the same seed key.
#[must_use]
pub fn substream(seed_key: &str, namespace: &str) -> Mulberry32 {
    Mulberry32::from_str(&format!("{seed_key}|{namespace}"))
}

/// Uniform choice from a slice. Returns `None` on an empty slice.
pub fn choice<'a, T>(rng: &mut Mulberry32, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    Some(&items[rng.next_usize(items.len())])
}

/// Weighted choice: linear selection proportional to weight, ties
/// resolved by order. Entries with non-positive weight are never picked
/// unless every weight is non-positive, in which case the first entry
/// wins. Returns `None` on an empty slice.
pub fn weighted_choice<'a, T>(rng: &mut Mulberry32, entries: &'a [(T, f64)]) -> Option<&'a T> {
    if entries.is_empty() {
        return None;
    }
    let total: f64 = entries.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return Some(&entries[0].0);
    }
    let mut r = rng.next_f64() * total;
    for (value, weight) in entries {
        let w = weight.max(0.0);
        if r < w {
            return Some(value);
        }
        r -= w;
    }
    // Floating-point edge: fall through to the last entry.
    entries.last().map(|(value, _)| value)
}

/// Fisher–Yates shuffle driven by the deterministic stream.
pub fn shuffle_in_place<T>(rng: &mut Mulberry32, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.next_usize(i + 1);
        items.swap(i, j);
    }
}
