//! Word vectors in the word2vec file format.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use ndarray::prelude::*;

use crate::query::{normalize, Lexicon};
use crate::vocab::Vocabulary;

pub struct Vectors {
    /// The vocabulary.
    vocab: Vec<String>,

    /// `embeddings.row(k)` is the vector embedding for word `k`, normalized
    /// to unit length.
    embeddings: Array2<f32>,
}

/// Write `embeddings` (one row per word of `vocab`) to `file_name`.
///
/// The first line is `<number of words> <size>`. Each word follows, then a
/// space, then its vector: as text, space-separated, or as raw native-endian
/// `f32`s if `binary` is set. Each entry ends with a newline.
pub fn save(file_name: &Path, vocab: &Vocabulary, embeddings: ArrayView2<'_, f32>, binary: bool) -> Result<()> {
    ensure!(
        embeddings.nrows() == vocab.len(),
        "{} vectors for {} words",
        embeddings.nrows(),
        vocab.len()
    );
    let mut fo = BufWriter::new(File::create(file_name).context("error creating output file")?);
    writeln!(fo, "{} {}", vocab.len(), embeddings.ncols()).context("error writing output file")?;
    for (word, row) in vocab.words().iter().zip(embeddings.rows()) {
        write!(fo, "{word} ").context("error writing output file")?;
        if binary {
            let row = row.to_vec();
            fo.write_all(bytemuck::cast_slice::<f32, u8>(&row))
                .context("error writing output file")?;
        } else {
            for f in row {
                write!(fo, "{f} ").context("error writing output file")?;
            }
        }
        writeln!(fo).context("error writing output file")?;
    }
    fo.flush().context("error writing output file")?;
    Ok(())
}

impl Vectors {
    /// Read a file in the format `save` writes.
    pub fn load(file_name: &Path, binary: bool) -> Result<Self> {
        let mut f = BufReader::new(File::open(file_name).context("error opening input file")?);
        let mut line = String::new();
        f.read_line(&mut line).context("error reading input file")?;
        let mut fields = line.split_whitespace();
        let num_words: usize = fields
            .next()
            .ok_or_else(|| anyhow!("invalid input file"))?
            .parse()
            .context("invalid input file")?;
        let size: usize = fields
            .next()
            .ok_or_else(|| anyhow!("invalid input file"))?
            .parse()
            .context("invalid input file")?;

        let mut vocab: Vec<String> = Vec::with_capacity(num_words);
        let mut m = Array2::<f32>::zeros((num_words, size));
        for mut row in m.rows_mut() {
            let mut vocab_word = Vec::<u8>::new();
            let count = f
                .read_until(b' ', &mut vocab_word)
                .context("error reading input file")?;
            ensure!(count > 0, "input file ends after {} of {num_words} words", vocab.len());
            if vocab_word.last() == Some(&b' ') {
                vocab_word.pop();
            }
            vocab_word.retain(|c| *c != b'\n');
            vocab.push(String::from_utf8(vocab_word).context("invalid word in input file")?);

            let row = row
                .as_slice_mut()
                .expect("rows of a fresh array are contiguous");
            if binary {
                f.read_exact(bytemuck::cast_slice_mut::<f32, u8>(row))
                    .context("error reading input file")?;
            } else {
                line.clear();
                f.read_line(&mut line).context("error reading input file")?;
                let values = line
                    .split_whitespace()
                    .map(str::parse::<f32>)
                    .collect::<Result<Vec<f32>, _>>()
                    .context("invalid number in input file")?;
                ensure!(values.len() == size, "wrong vector size in input file");
                row.copy_from_slice(&values);
            }
        }
        for row in m.rows_mut() {
            normalize(row);
        }

        Ok(Vectors {
            vocab,
            embeddings: m,
        })
    }

    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn embeddings(&self) -> ArrayView2<'_, f32> {
        self.embeddings.view()
    }
}

impl Lexicon for Vectors {
    fn len(&self) -> usize {
        self.vocab.len()
    }

    /// Panics if `word` is out of range.
    fn word(&self, word: usize) -> &str {
        &self.vocab[word]
    }

    /// Exact match only, case-sensitive.
    fn lookup(&self, word: &str) -> Option<usize> {
        self.vocab.iter().position(|v| v == word)
    }
}
