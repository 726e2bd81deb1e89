//! The training loop.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use myml::optim::Sgd;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::batch::BatchSampler;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::corpus::{Corpus, Materialized};
use crate::model::{ModelState, StepStats};
use crate::query::{word_list, QueryEngine};
use crate::vectors;

pub struct Trainer<'c> {
    config: &'c Config,
    corpus: &'c Corpus,
    sampler: BatchSampler<'c>,
    sgd: Sgd,
    store: CheckpointStore,
    rng: StdRng,
}

impl<'c> Trainer<'c> {
    pub fn new(config: &'c Config, corpus: &'c Corpus) -> Result<Self> {
        let sampler = BatchSampler::new(corpus, config.batch_size, config.noise_size)?;
        info!("noise table has {} entries", sampler.noise_table().len());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Trainer {
            config,
            corpus,
            sampler,
            sgd: Sgd::new(config.learning_rate),
            store: CheckpointStore::new(&config.save_file),
            rng,
        })
    }

    /// The latest checkpoint if there is one, otherwise fresh parameters.
    pub fn restore_or_init(&mut self) -> Result<ModelState> {
        let vocab_size = self.corpus.domain.len();
        let dim = self.config.embed_dim;
        match self.store.restore()? {
            Some(state) => {
                state.check_shape(vocab_size, dim)?;
                info!("resuming at step {}", state.global_step);
                Ok(state)
            }
            None => {
                info!("no checkpoint found; initializing {vocab_size}x{dim} embeddings");
                Ok(ModelState::new(vocab_size, dim, &mut self.rng))
            }
        }
    }

    /// Sample a batch and take one optimization step on it.
    pub fn step(&mut self, state: &mut ModelState) -> StepStats {
        let batch = self.sampler.sample(&mut self.rng);
        state.step(&batch, &self.sgd)
    }

    /// Log the probe queries against the current center embeddings.
    pub fn evaluate(&self, state: &ModelState) {
        let k = self.config.top_k;
        let engine = QueryEngine::new(&self.corpus.domain, state.q.view());
        for word in &self.config.probes {
            match engine.nearest(word, k) {
                Ok(neighbors) => info!("{word} is close to {}", word_list(&neighbors)),
                Err(err) => warn!("skipping probe: {err}"),
            }
        }
        for analogy in &self.config.analogies {
            match engine.analogy(&analogy.a, &analogy.b, &analogy.c, k) {
                Ok(neighbors) => info!("{analogy} {}", word_list(&neighbors)),
                Err(err) => warn!("skipping analogy: {err}"),
            }
        }
    }

    /// Train until the global step reaches `config.training_steps`.
    ///
    /// Saves a checkpoint every `interval_save` steps and once more at the end
    /// if the last step wasn't saved.
    pub fn run(&mut self, mut state: ModelState) -> Result<ModelState> {
        let target = self.config.training_steps;
        if state.global_step >= target {
            info!("already at step {} of {target}", state.global_step);
            return Ok(state);
        }

        info!(
            "training from step {} to {target} with learning rate {}",
            state.global_step,
            self.sgd.learning_rate()
        );
        let bar = ProgressBar::new(target);
        bar.set_style(ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )?);
        bar.set_position(state.global_step);

        let mut last_saved = state.global_step;
        while state.global_step < target {
            let stats = self.step(&mut state);
            let step = state.global_step;
            bar.set_position(step);

            if step % self.config.interval_print == 0 {
                bar.set_message(format!("loss {:.4}", stats.loss));
                bar.suspend(|| {
                    info!(
                        "step {step}: loss {:.6}, accuracy {:.4}",
                        stats.loss, stats.accuracy
                    )
                });
            }
            if step % self.config.interval_test == 0 {
                bar.suspend(|| self.evaluate(&state));
            }
            if step % self.config.interval_save == 0 {
                bar.suspend(|| self.store.save(&state))?;
                last_saved = step;
            }
        }
        bar.finish_and_clear();

        if last_saved != state.global_step {
            self.store.save(&state)?;
        }
        Ok(state)
    }
}

/// Materialize the corpus, then train and export as `config` says.
pub fn run(config: &Config) -> Result<ModelState> {
    let corpus = match Corpus::load_or_build(config)? {
        Materialized::Loaded(corpus) => {
            info!("loaded cached corpus from {:?}", config.data_dir);
            corpus
        }
        Materialized::Rebuilt(corpus) => {
            info!("rebuilt corpus and cached it in {:?}", config.data_dir);
            corpus
        }
    };
    info!(
        "{} tokens, {} distinct words",
        corpus.len(),
        corpus.domain.len()
    );
    if let Some(path) = &config.save_vocab_file {
        corpus.domain.save_text(path)?;
    }

    let mut trainer = Trainer::new(config, &corpus)?;
    let state = trainer.restore_or_init()?;
    let state = trainer.run(state)?;

    if let Some(path) = &config.output_file {
        vectors::save(path, &corpus.domain, state.q.view(), config.binary)?;
        info!("wrote word vectors to {path:?}");
    }
    Ok(state)
}
