//! The indexed corpus and its sampling tables, cached on disk.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::sampling::{noise_distribution, subsample_weights};
use crate::vocab::{read_tokens, Vocabulary};

pub const CONTENT_FILE: &str = "content.bin";
pub const CONTENT_PD_FILE: &str = "content_pd.bin";
pub const DOMAIN_FILE: &str = "domain.bin";
pub const NOISE_PD_FILE: &str = "noise_pd.bin";

/// Everything the batch sampler needs to know about the training text.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    /// Vocabulary index of every token in the text.
    pub content: Vec<u32>,
    /// Subsample weight of each center position `window_size..len - window_size`,
    /// summing to 1.
    pub content_pd: Vec<f64>,
    pub domain: Vocabulary,
    /// Noise probability of each vocabulary word, summing to 1.
    pub noise_pd: Vec<f64>,
    pub window_size: usize,
}

/// How `Corpus::load_or_build` got its result.
#[derive(Debug)]
pub enum Materialized {
    /// All four tables were read from the cache directory.
    Loaded(Corpus),
    /// The cache was missing or unusable; everything was rebuilt from the
    /// training text and written back.
    Rebuilt(Corpus),
}

impl Materialized {
    pub fn corpus(&self) -> &Corpus {
        match self {
            Materialized::Loaded(c) | Materialized::Rebuilt(c) => c,
        }
    }

    pub fn into_corpus(self) -> Corpus {
        match self {
            Materialized::Loaded(c) | Materialized::Rebuilt(c) => c,
        }
    }
}

fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = BufReader::new(
        File::open(path).with_context(|| format!("failed to open cache file {path:?}"))?,
    );
    bincode::deserialize_from(f).with_context(|| format!("failed to decode cache file {path:?}"))
}

fn save_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = BufWriter::new(
        File::create(path).with_context(|| format!("failed to create cache file {path:?}"))?,
    );
    bincode::serialize_into(&mut f, value)
        .with_context(|| format!("failed to write cache file {path:?}"))?;
    f.flush()
        .with_context(|| format!("failed to write cache file {path:?}"))
}

impl Corpus {
    /// Index `tokens` and compute the sampling tables.
    pub fn from_tokens<S: AsRef<str>>(
        tokens: &[S],
        domain_size: usize,
        label_unknown: &str,
        window_size: usize,
    ) -> Result<Corpus, Error> {
        let (domain, content) = Vocabulary::build(tokens, domain_size, label_unknown)?;
        let content_pd = subsample_weights(domain.counts(), &content, window_size)?;
        let noise_pd = noise_distribution(domain.counts())?;
        Ok(Corpus {
            content,
            content_pd,
            domain,
            noise_pd,
            window_size,
        })
    }

    /// Read the training text named by `config` and index it.
    pub fn read(config: &Config) -> Result<Corpus> {
        info!("reading content from {:?}", config.train_file);
        let tokens = read_tokens(&config.train_file)?;
        info!("content length is {}", tokens.len());
        let corpus = Corpus::from_tokens(
            &tokens,
            config.domain_size,
            &config.label_unknown,
            config.window,
        )?;
        Ok(corpus)
    }

    /// Load all four tables from `dir`. Fails unless they are all present
    /// and agree with each other and with `window_size`.
    pub fn load(dir: &Path, window_size: usize) -> Result<Corpus> {
        let corpus = Corpus {
            content: load_artifact(&dir.join(CONTENT_FILE))?,
            content_pd: load_artifact(&dir.join(CONTENT_PD_FILE))?,
            domain: load_artifact(&dir.join(DOMAIN_FILE))?,
            noise_pd: load_artifact(&dir.join(NOISE_PD_FILE))?,
            window_size,
        };
        corpus.check()?;
        Ok(corpus)
    }

    fn check(&self) -> Result<()> {
        let v = self.domain.len();
        ensure!(self.domain.is_well_formed(), "cached vocabulary is malformed");
        ensure!(
            self.noise_pd.len() == v,
            "cached noise distribution has {} entries for {v} words",
            self.noise_pd.len()
        );
        ensure!(
            self.content.iter().all(|&i| (i as usize) < v),
            "cached content refers to words outside the vocabulary"
        );
        ensure!(
            self.content.len() > 2 * self.window_size
                && self.content_pd.len() == self.content.len() - 2 * self.window_size,
            "cached subsample weights do not match a window size of {}",
            self.window_size
        );
        Ok(())
    }

    /// Write all four tables into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create cache directory {dir:?}"))?;
        save_artifact(&dir.join(CONTENT_FILE), &self.content)?;
        save_artifact(&dir.join(CONTENT_PD_FILE), &self.content_pd)?;
        save_artifact(&dir.join(DOMAIN_FILE), &self.domain)?;
        save_artifact(&dir.join(NOISE_PD_FILE), &self.noise_pd)?;
        Ok(())
    }

    /// Use the cached tables in `config.data_dir` if they are all there and
    /// usable; otherwise rebuild all of them from `config.train_file` and
    /// cache the result.
    pub fn load_or_build(config: &Config) -> Result<Materialized> {
        info!("loading domain information from {:?}", config.data_dir);
        match Corpus::load(&config.data_dir, config.window) {
            Ok(corpus) => Ok(Materialized::Loaded(corpus)),
            Err(err) => {
                info!("cache unusable ({err:#}); rebuilding");
                let corpus = Corpus::read(config)?;
                corpus.save(&config.data_dir)?;
                Ok(Materialized::Rebuilt(corpus))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
