use std::fs;
use std::iter;
use std::path::Path;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use skipgram::batch::BatchSampler;
use skipgram::checkpoint::CheckpointStore;
use skipgram::corpus::{self, Corpus, Materialized};
use skipgram::train::{self, Trainer};
use skipgram::{Config, Error, Lexicon, Vectors};

const SENTENCES: [&str; 4] = [
    "the cat sat on the mat",
    "the dog sat on the rug",
    "a king rules the land and a queen rules the land",
    "the man walks the dog and the woman walks the cat",
];

fn write_corpus(dir: &Path) {
    let mut text = String::new();
    for i in 0..60 {
        text.push_str(SENTENCES[i % SENTENCES.len()]);
        text.push(' ');
    }
    // only the first line is training data
    text.push_str("\nignored second line with other words\n");
    fs::write(dir.join("corpus.txt"), text).unwrap();
}

/// Options for a small, fast, seeded run. `overrides` replace or add
/// `(flag, value)` pairs.
fn config(dir: &Path, overrides: &[(&str, &str)]) -> Config {
    let path = |name: &str| dir.join(name).display().to_string();
    let mut options: Vec<(String, String)> = [
        ("--train", path("corpus.txt")),
        ("--data-dir", path("data")),
        ("--save", path("model/model.ckpt")),
        ("--batch-size", "32".into()),
        ("--size", "8".into()),
        ("--window", "2".into()),
        ("--noise-size", "4".into()),
        ("--alpha", "0.002".into()),
        ("--steps", "20".into()),
        ("--interval-save", "5".into()),
        ("--interval-print", "3".into()),
        ("--interval-test", "4".into()),
        ("--seed", "17".into()),
    ]
    .into_iter()
    .map(|(flag, value)| (flag.to_string(), value))
    .collect();
    for &(flag, value) in overrides {
        match options.iter_mut().find(|(f, _)| f == flag) {
            Some(option) => option.1 = value.to_string(),
            None => options.push((flag.to_string(), value.to_string())),
        }
    }

    let args = iter::once("skipgram".to_string())
        .chain(options.into_iter().flat_map(|(flag, value)| [flag, value]));
    let config = Config::parse_from(args);
    config.validate().unwrap();
    config
}

#[test]
fn cache_is_built_once_then_loaded() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = config(dir.path(), &[]);

    let built = match Corpus::load_or_build(&config).unwrap() {
        Materialized::Rebuilt(c) => c,
        Materialized::Loaded(_) => panic!("expected a rebuild on an empty cache"),
    };
    assert!(built.domain.lookup("ignored").is_none());
    assert!(built.domain.lookup("cat").is_some());

    let loaded = match Corpus::load_or_build(&config).unwrap() {
        Materialized::Loaded(c) => c,
        Materialized::Rebuilt(_) => panic!("expected the cache to be used"),
    };
    assert_eq!(loaded, built);

    // a different window makes the cached weight table unusable
    let config = self::config(dir.path(), &[("--window", "3")]);
    let rebuilt = Corpus::load_or_build(&config).unwrap();
    assert!(matches!(rebuilt, Materialized::Rebuilt(_)));
    assert_eq!(rebuilt.corpus().content_pd.len(), built.len() - 6);
}

#[test]
fn corrupt_cache_file_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = config(dir.path(), &[]);
    let built = Corpus::load_or_build(&config).unwrap().into_corpus();

    fs::write(dir.path().join("data").join(corpus::CONTENT_FILE), b"xx").unwrap();
    match Corpus::load_or_build(&config).unwrap() {
        Materialized::Rebuilt(c) => assert_eq!(c, built),
        Materialized::Loaded(_) => panic!("a corrupt cache file should force a rebuild"),
    }
    assert!(matches!(
        Corpus::load_or_build(&config).unwrap(),
        Materialized::Loaded(_)
    ));
}

#[test]
fn fresh_run_counts_steps_then_resumes() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let state = train::run(&config(dir.path(), &[("--steps", "7")])).unwrap();
    assert_eq!(state.global_step, 7);

    let store = CheckpointStore::new(dir.path().join("model/model.ckpt"));
    assert!(store.path_for_step(5).is_file());
    assert_eq!(store.latest().unwrap(), Some(store.path_for_step(7)));
    assert_eq!(store.restore().unwrap().unwrap(), state);

    let resumed = train::run(&config(dir.path(), &[("--steps", "12")])).unwrap();
    assert_eq!(resumed.global_step, 12);
    assert!(store.path_for_step(10).is_file());
    assert_eq!(store.latest().unwrap(), Some(store.path_for_step(12)));

    // nothing left to do
    let again = train::run(&config(dir.path(), &[("--steps", "12")])).unwrap();
    assert_eq!(again, resumed);
}

#[test]
fn checkpoint_for_other_shape_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    train::run(&config(dir.path(), &[("--steps", "2")])).unwrap();

    let err = train::run(&config(dir.path(), &[("--steps", "4"), ("--size", "4")])).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn training_lowers_the_loss() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = config(dir.path(), &[("--steps", "300"), ("--interval-save", "1000")]);
    let corpus = Corpus::load_or_build(&config).unwrap().into_corpus();

    let sampler = BatchSampler::new(&corpus, 512, config.noise_size).unwrap();
    let held_out = sampler.sample(&mut StdRng::seed_from_u64(99));

    let mut trainer = Trainer::new(&config, &corpus).unwrap();
    let state = trainer.restore_or_init().unwrap();
    assert_eq!(state.global_step, 0);
    let before = state.loss(&held_out);
    let state = trainer.run(state).unwrap();
    assert_eq!(state.global_step, 300);
    assert!(state.loss(&held_out) < before);
}

#[test]
fn exported_vectors_load_back() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let out = dir.path().join("vectors.txt");
    let vocab_file = dir.path().join("vocab.txt");
    let out_arg = out.display().to_string();
    let vocab_arg = vocab_file.display().to_string();
    let state = train::run(&config(
        dir.path(),
        &[("--steps", "3"), ("--output", &out_arg), ("--save-vocab", &vocab_arg)],
    ))
    .unwrap();

    let vectors = Vectors::load(&out, false).unwrap();
    assert_eq!(vectors.num_words(), state.vocab_size());
    assert_eq!(vectors.size(), 8);
    let king = vectors.lookup("king").unwrap();
    let q = state.q.row(king);
    let expected = &q / q.dot(&q).sqrt();
    for (a, b) in vectors.embeddings().row(king).iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-5);
    }

    let vocab = fs::read_to_string(&vocab_file).unwrap();
    assert_eq!(vocab.lines().count(), state.vocab_size());
    assert!(vocab.lines().any(|l| l.starts_with("the ")));
}
