//! Vocabulary construction.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::query::Lexicon;

/// The words the model knows about, in lexicographic order, with the number
/// of times each one occurs in the corpus.
///
/// Index `i` in every per-word table of the model refers to `words[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    words: Vec<String>,
    counts: Vec<u64>,
    unknown_label: String,
}

/// Read the training text: the first line of the file, lowercased and split
/// on whitespace.
pub fn read_tokens(file_name: &Path) -> Result<Vec<String>> {
    let mut f = BufReader::new(
        File::open(file_name)
            .with_context(|| format!("error opening training data file {file_name:?}"))?,
    );
    let mut line = String::new();
    f.read_line(&mut line)
        .with_context(|| format!("error reading training data file {file_name:?}"))?;
    Ok(line
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

/// Sorted distinct words, their counts, and the index of each token.
fn unique<'t>(tokens: &[&'t str]) -> (Vec<&'t str>, Vec<u64>, Vec<u32>) {
    let mut counts = BTreeMap::<&str, u64>::new();
    for &t in tokens {
        *counts.entry(t).or_default() += 1;
    }
    let (words, counts): (Vec<&str>, Vec<u64>) = counts.into_iter().unzip();
    let content = tokens
        .iter()
        .map(|t| {
            words
                .binary_search(t)
                .expect("every token was counted") as u32
        })
        .collect();
    (words, counts, content)
}

impl Vocabulary {
    /// Build the vocabulary for `tokens`, keeping at most `domain_size`
    /// distinct words.
    ///
    /// When there are more distinct words than that, the `u - domain_size + 1`
    /// least frequent ones are all replaced by `unknown_label`, which then
    /// takes up the one remaining slot. Which words go when several have the
    /// same count at the cutoff is unspecified.
    ///
    /// Returns the vocabulary and the index of every token.
    pub fn build<S: AsRef<str>>(
        tokens: &[S],
        domain_size: usize,
        unknown_label: &str,
    ) -> Result<(Vocabulary, Vec<u32>), Error> {
        if domain_size == 0 {
            return Err(Error::InvalidConfig(
                "vocabulary size cap must be at least 1".to_string(),
            ));
        }

        let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let (mut words, mut counts, mut content) = unique(&tokens);
        info!("raw domain size is {}", words.len());

        if words.len() > domain_size {
            info!("cropping domain to {domain_size} words");
            let num_dropped = words.len() - domain_size + 1;
            let mut by_count: Vec<usize> = (0..words.len()).collect();
            by_count.select_nth_unstable_by_key(num_dropped - 1, |&i| counts[i]);

            let mut dropped = vec![false; words.len()];
            for &i in &by_count[..num_dropped] {
                dropped[i] = true;
            }
            let relabeled: Vec<&str> = content
                .iter()
                .map(|&i| {
                    if dropped[i as usize] {
                        unknown_label
                    } else {
                        words[i as usize]
                    }
                })
                .collect();
            (words, counts, content) = unique(&relabeled);
        }
        info!("domain size is {}", words.len());

        let vocab = Vocabulary {
            words: words.into_iter().map(str::to_string).collect(),
            counts,
            unknown_label: unknown_label.to_string(),
        };
        Ok((vocab, content))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Get the index for a word. Exact match only, case-sensitive.
    pub fn lookup(&self, word: &str) -> Option<usize> {
        self.words.binary_search_by(|w| w.as_str().cmp(word)).ok()
    }

    /// Get the word for a word-index. Panics if `index` is out of range.
    pub fn word(&self, index: usize) -> &str {
        &self.words[index]
    }

    pub fn count(&self, index: usize) -> u64 {
        self.counts[index]
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Index of the label that stands in for dropped words, if it is in the
    /// vocabulary.
    pub fn unknown_index(&self) -> Option<usize> {
        self.lookup(&self.unknown_label)
    }

    /// True if the words are sorted and distinct and every word has a
    /// nonzero count. A vocabulary read from disk must pass this before use.
    pub fn is_well_formed(&self) -> bool {
        self.words.len() == self.counts.len()
            && self.words.windows(2).all(|w| w[0] < w[1])
            && self.counts.iter().all(|&c| c > 0)
    }

    /// Write one `word count` line per word.
    pub fn save_text(&self, vocab_file: &Path) -> Result<()> {
        let mut fo = BufWriter::new(
            File::create(vocab_file).context("error creating vocab file for write")?,
        );
        for (word, count) in self.words.iter().zip(&self.counts) {
            writeln!(fo, "{word} {count}").context("error writing vocab file")?;
        }
        fo.flush().context("error writing vocab file")?;
        Ok(())
    }
}

impl Lexicon for Vocabulary {
    fn len(&self) -> usize {
        self.words.len()
    }

    fn word(&self, index: usize) -> &str {
        &self.words[index]
    }

    fn lookup(&self, word: &str) -> Option<usize> {
        Vocabulary::lookup(self, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNK: &str = "*UNKNOWN*";

    fn tokens(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn small_corpus_is_kept_whole() {
        let t = tokens("b a c a b a");
        let (vocab, content) = Vocabulary::build(&t, 10, UNK).unwrap();
        assert_eq!(vocab.words(), ["a", "b", "c"]);
        assert_eq!(vocab.counts(), [3, 2, 1]);
        assert_eq!(content, [1, 0, 2, 0, 1, 0]);
        assert_eq!(vocab.unknown_index(), None);
        assert!(vocab.is_well_formed());
    }

    #[test]
    fn cap_collapses_rare_words() {
        // counts: the=5 cat=3 sat=2 on=1 mat=1 rug=1
        let t = tokens("the cat the sat the cat on the mat the cat sat rug");
        let (vocab, content) = Vocabulary::build(&t, 4, UNK).unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.words(), [UNK, "cat", "sat", "the"]);
        let unk = vocab.unknown_index().unwrap();
        assert_eq!(vocab.count(unk), 3);
        assert_eq!(vocab.counts().iter().sum::<u64>(), t.len() as u64);
        for (&token, &i) in t.iter().zip(&content) {
            let word = vocab.word(i as usize);
            assert!(word == token || (word == UNK && ["on", "mat", "rug"].contains(&token)));
        }
    }

    #[test]
    fn cap_property_holds_for_every_cap() {
        let text = "a b c d e f g h a b c d a b c a b a x y z z y z";
        let t = tokens(text);
        let distinct = 11;
        for cap in 1..distinct {
            let (vocab, content) = Vocabulary::build(&t, cap, UNK).unwrap();
            assert_eq!(vocab.len(), cap, "cap {cap}");
            assert_eq!(vocab.words().iter().filter(|w| *w == UNK).count(), 1);
            let unk = vocab.unknown_index().unwrap();
            let collapsed = content.iter().filter(|&&i| i as usize == unk).count() as u64;
            assert_eq!(vocab.count(unk), collapsed);
            assert!(vocab.is_well_formed());
        }
    }

    #[test]
    fn zero_cap_is_an_error() {
        assert!(matches!(
            Vocabulary::build(&["a"], 0, UNK),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn lookup_is_exact() {
        let (vocab, _) = Vocabulary::build(&tokens("dog cat"), 10, UNK).unwrap();
        assert_eq!(vocab.lookup("cat"), Some(0));
        assert_eq!(vocab.lookup("dog"), Some(1));
        assert_eq!(vocab.lookup("Dog"), None);
    }
}
