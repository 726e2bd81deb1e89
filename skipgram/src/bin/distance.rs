use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use ndarray::Array1;

use skipgram::{Lexicon, QueryEngine, Vectors};

/// Show the words closest to a word or sentence, by cosine distance.
#[derive(Parser)]
struct Options {
    /// Contains word projections written by `skipgram --output`
    #[arg(value_name = "FILE")]
    file_name: PathBuf,

    /// The file is in binary format
    #[arg(long)]
    binary: bool,

    /// Number of closest words that will be shown
    #[arg(short = 'n', long, default_value_t = 40)]
    count: usize,
}

fn run(options: &Options) -> Result<()> {
    let vectors = Vectors::load(&options.file_name, options.binary)?;
    let engine = QueryEngine::new(&vectors, vectors.embeddings());

    let mut line = String::new();
    'outer: loop {
        print!("Enter word or sentence (EXIT to break): ");
        let _ = std::io::stdout().flush();

        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "EXIT" {
            break;
        }

        let mut bi: Vec<usize> = vec![];
        for word in line.split_whitespace() {
            println!();
            print!("Word: {word}  Position in vocabulary: ");
            match vectors.lookup(word) {
                None => {
                    println!("None");
                    println!("Out of dictionary word!");
                    continue 'outer;
                }
                Some(i) => {
                    println!("{i}");
                    bi.push(i);
                }
            }
        }
        if bi.is_empty() {
            continue;
        }

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");

        let mut target = Array1::<f32>::zeros(vectors.size());
        for &i in &bi {
            target += &vectors.embeddings().row(i);
        }
        for n in engine.by_cosine(target.view(), options.count, &bi) {
            println!("{:>50}\t\t{:8.6}", n.word, n.score);
        }
    }
    Ok(())
}

fn main() {
    let options = Options::parse();
    if let Err(err) = run(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
