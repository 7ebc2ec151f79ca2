// Per-match word supply for enemy assignment.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

/// Built-in dictionary used when a session does not supply its own.
pub const DEFAULT_WORDS: &[&str] = &[
    "apple", "banana", "cherry", "grave", "torch", "spark", "shadow", "raven",
    "ember", "frost", "vine", "skull", "crypt", "howl", "fang", "witch",
    "ghoul", "pumpkin", "lantern", "mist", "thorn", "bone", "drift", "cinder",
    "gloom", "marsh", "owl", "moon", "dusk", "veil", "wisp", "rune",
    "hex", "omen", "ash", "storm", "briar", "night", "hollow", "tomb",
];

/// The per-match set of words available for assignment, minus those
/// currently in flight.
///
/// A word is in flight from `draw` until the enemy carrying it is killed;
/// words on breached enemies stay used for the rest of the run. The pool is
/// owned by one match and rebuilt on every start, so nothing leaks across
/// matches.
#[derive(Debug)]
pub struct WordPool {
    dictionary: Vec<String>,
    working: Vec<String>,
    used: HashSet<String>,
    subset_size: usize,
}

impl WordPool {
    pub fn new(dictionary: Vec<String>, subset_size: usize) -> Self {
        let dictionary = dictionary.into_iter().map(|w| w.to_lowercase()).collect();
        Self {
            dictionary,
            working: Vec::new(),
            used: HashSet::new(),
            subset_size,
        }
    }

    pub fn default_dictionary() -> Vec<String> {
        DEFAULT_WORDS.iter().map(|w| (*w).to_string()).collect()
    }

    /// Redraws the working subset and clears the used-set for a fresh run.
    pub fn reset(&mut self, rng: &mut impl Rng) {
        let mut subset = self.dictionary.clone();
        subset.shuffle(rng);
        subset.truncate(self.subset_size);
        self.working = subset;
        self.used.clear();
    }

    /// Draws a word not currently in flight. None means the working set is
    /// exhausted, which the spawn policy treats as a skipped tick rather
    /// than an error.
    pub fn draw(&mut self, rng: &mut impl Rng) -> Option<String> {
        let available: Vec<&String> = self
            .working
            .iter()
            .filter(|w| !self.used.contains(*w))
            .collect();
        let word = (*available.choose(rng)?).clone();
        self.used.insert(word.clone());
        Some(word)
    }

    /// Returns a killed enemy's word to availability.
    pub fn release(&mut self, word: &str) {
        self.used.remove(word);
    }

    /// Marks a word introduced by the peer as used, so local spawns cannot
    /// duplicate it while its enemy is alive. Returns false when the word
    /// was already in flight.
    pub fn reserve(&mut self, word: &str) -> bool {
        self.used.insert(word.to_lowercase())
    }

    pub fn available(&self) -> usize {
        self.working
            .iter()
            .filter(|w| !self.used.contains(*w))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(words: &[&str], subset: usize) -> (WordPool, StdRng) {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool = WordPool::new(words.iter().map(|w| w.to_string()).collect(), subset);
        pool.reset(&mut rng);
        (pool, rng)
    }

    #[test]
    fn draws_are_unique_until_exhaustion() {
        let (mut pool, mut rng) = pool(&["cat", "dog", "owl"], 3);
        let mut drawn = Vec::new();
        while let Some(word) = pool.draw(&mut rng) {
            drawn.push(word);
        }
        drawn.sort();
        assert_eq!(drawn, vec!["cat", "dog", "owl"]);
        assert!(pool.draw(&mut rng).is_none());
    }

    #[test]
    fn release_returns_a_word_to_availability() {
        let (mut pool, mut rng) = pool(&["cat"], 1);
        let word = pool.draw(&mut rng).expect("one word available");
        assert!(pool.draw(&mut rng).is_none());
        pool.release(&word);
        assert_eq!(pool.draw(&mut rng), Some(word));
    }

    #[test]
    fn reserve_blocks_a_local_draw() {
        let (mut pool, mut rng) = pool(&["cat"], 1);
        assert!(pool.reserve("CAT"));
        assert!(pool.draw(&mut rng).is_none());
        assert!(!pool.reserve("cat"));
    }

    #[test]
    fn reset_clears_the_used_set() {
        let (mut pool, mut rng) = pool(&["cat", "dog"], 2);
        pool.draw(&mut rng);
        pool.draw(&mut rng);
        assert_eq!(pool.available(), 0);
        pool.reset(&mut rng);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn working_set_is_capped_at_the_subset_size() {
        let (pool, _rng) = pool(&["cat", "dog", "owl", "fox"], 2);
        assert_eq!(pool.available(), 2);
    }
}
