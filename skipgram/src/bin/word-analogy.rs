use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use skipgram::query::normalize;
use skipgram::{Lexicon, QueryEngine, Vectors};

/// Answer "A is to B as C is to ?" from exported word vectors.
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
        print!("Enter three words (EXIT to break): ");
        let _ = std::io::stdout().flush();

        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim() == "EXIT" {
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

        if bi.len() != 3 {
            println!(
                "{} words were entered.. three words are needed at the input to perform the calculation",
                bi.len()
            );
            continue;
        }

        println!();
        println!("                                              Word              Distance");
        println!("------------------------------------------------------------------------");

        let m = vectors.embeddings();
        let mut target = &m.row(bi[1]) - &m.row(bi[0]) + &m.row(bi[2]);
        normalize(target.view_mut());
        for n in engine.by_dot(target.view(), options.count, &bi) {
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
