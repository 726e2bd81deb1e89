use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::error::Error;

/// Training options. All of them are fixed when the process starts.
#[derive(Parser, Debug, Clone)]
#[command(about = "Train word embeddings with skip-gram and negative sampling", long_about = None)]
pub struct Config {
    /// Use text data from FILE to train the model (only the first line is read)
    #[arg(long = "train", value_name = "FILE", default_value = "../text8")]
    pub train_file: PathBuf,

    /// Cache the indexed corpus and sampling tables in DIR
    #[arg(long = "data-dir", value_name = "DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Checkpoint path prefix; checkpoints are written to PREFIX-<step>
    #[arg(long = "save", value_name = "PREFIX", default_value = "./model/model.ckpt")]
    pub save_file: PathBuf,

    /// Number of positive pairs (and of noise pairs) in each batch
    #[arg(long, default_value_t = 8192)]
    pub batch_size: usize,

    /// Set size of word vectors
    #[arg(long = "size", default_value_t = 512)]
    pub embed_dim: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 10)]
    pub window: usize,

    /// Noise table granularity: a word of average probability gets at least
    /// this many slots in the noise table
    #[arg(long, default_value_t = 64)]
    pub noise_size: usize,

    /// Learning rate
    #[arg(long = "alpha", default_value_t = 1e-6)]
    pub learning_rate: f32,

    /// Train until the global step reaches N
    #[arg(long = "steps", value_name = "N", default_value_t = 1_000_000)]
    pub training_steps: u64,

    /// Save a checkpoint every N steps
    #[arg(long, value_name = "N", default_value_t = 100_000)]
    pub interval_save: u64,

    /// Log the loss every N steps
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub interval_print: u64,

    /// Run the probe queries every N steps
    #[arg(long, value_name = "N", default_value_t = 1500)]
    pub interval_test: u64,

    /// Keep at most N distinct words; rarer words become the unknown label
    #[arg(long, value_name = "N", default_value_t = 100_000)]
    pub domain_size: usize,

    /// Label that replaces words dropped from the vocabulary
    #[arg(long = "unknown", value_name = "LABEL", default_value = "*UNKNOWN*")]
    pub label_unknown: String,

    /// Seed for the batch sampler and parameter initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Word whose nearest neighbors are shown at each evaluation
    #[arg(
        long = "probe",
        value_name = "WORD",
        value_parser = parse_probe,
        default_values = ["one", "circle", "france"]
    )]
    pub probes: Vec<String>,

    /// Analogy `a:b:c` ("a is to b as c is to ?") shown at each evaluation
    #[arg(
        long = "analogy",
        value_name = "A:B:C",
        default_values = ["man:woman:king", "rectangle:circle:cube"]
    )]
    pub analogies: Vec<Analogy>,

    /// Number of words listed for each probe
    #[arg(long, value_name = "K", default_value_t = 5)]
    pub top_k: usize,

    /// Write the trained word vectors to FILE when training stops
    #[arg(long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Save the resulting vectors in binary mode
    #[arg(long)]
    pub binary: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    pub save_vocab_file: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("--batch-size", self.batch_size as u64),
            ("--size", self.embed_dim as u64),
            ("--window", self.window as u64),
            ("--noise-size", self.noise_size as u64),
            ("--domain-size", self.domain_size as u64),
            ("--interval-save", self.interval_save),
            ("--interval-print", self.interval_print),
            ("--interval-test", self.interval_test),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "--alpha must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Probe words are matched against the lowercased vocabulary.
fn parse_probe(s: &str) -> Result<String, Error> {
    let word = s.trim();
    if word.is_empty() {
        return Err(Error::InvalidConfig("probe word is empty".to_string()));
    }
    Ok(word.to_lowercase())
}

/// "`a` is to `b` as `c` is to ?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analogy {
    pub a: String,
    pub b: String,
    pub c: String,
}

impl FromStr for Analogy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let words: Vec<&str> = s.split(':').map(str::trim).collect();
        match words[..] {
            [a, b, c] if !a.is_empty() && !b.is_empty() && !c.is_empty() => Ok(Analogy {
                a: a.to_lowercase(),
                b: b.to_lowercase(),
                c: c.to_lowercase(),
            }),
            _ => Err(Error::InvalidConfig(format!(
                "analogy must look like `a:b:c`, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Analogy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} is {} to", self.a, self.b, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["skipgram"]);
        assert_eq!(config.batch_size, 8192);
        assert_eq!(config.embed_dim, 512);
        assert_eq!(config.window, 10);
        assert_eq!(config.domain_size, 100_000);
        assert_eq!(config.label_unknown, "*UNKNOWN*");
        assert_eq!(config.probes, ["one", "circle", "france"]);
        assert_eq!(config.analogies.len(), 2);
        assert_eq!(config.analogies[0], "man:woman:king".parse().unwrap());
        config.validate().unwrap();
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = Config::parse_from(["skipgram", "--window", "0"]);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn probes_are_lowercased() {
        let config = Config::parse_from(["skipgram", "--probe", "France", "--probe", "ONE"]);
        assert_eq!(config.probes, ["france", "one"]);
        assert!(Config::try_parse_from(["skipgram", "--probe", " "]).is_err());
    }

    #[test]
    fn analogy_syntax() {
        assert!("a:b".parse::<Analogy>().is_err());
        assert!("a::c".parse::<Analogy>().is_err());
        let analogy: Analogy = "Paris:France:Rome".parse().unwrap();
        assert_eq!(analogy.c, "rome");
        assert_eq!(analogy.to_string(), "paris to france is rome to");
    }
}
