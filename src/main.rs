use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use markov_brain::config::DEFAULT_ORDER;
use markov_brain::corpus::{is_supported_corpus, lines, read_texts};
use markov_brain::{Brain, BrainConfig, GraphStore, Tokenizer};

const DEFAULT_BRAIN_PATH: &str = "markov.brain";
const PROGRESS_EVERY_LINES: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "brain", about = "Learn from text and reply with Markov chains")]
struct Cli {
    /// Brain file to use
    #[arg(short, long, default_value = DEFAULT_BRAIN_PATH)]
    brain: PathBuf,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new, empty brain
    Init {
        #[arg(long, default_value_t = DEFAULT_ORDER)]
        order: usize,
        /// cobe or megahal
        #[arg(long, default_value = "cobe")]
        tokenizer: String,
        /// Stemmer used to widen reply pivots (e.g. english)
        #[arg(long)]
        stemmer: Option<String>,
        /// Replace an existing brain file
        #[arg(long)]
        force: bool,
    },
    /// Learn every line of the given files (.txt, .gz, .tar, .tar.gz, .zip)
    Learn {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Reply to one message
    Reply {
        #[command(flatten)]
        opts: ReplyOpts,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Interactive loop: every line is learned, then replied to
    Console {
        #[command(flatten)]
        opts: ReplyOpts,
    },
    /// Set or remove (`none`) the stemmer and re-index the vocabulary
    SetStemmer { name: String },
    /// Show brain metadata and graph size
    Stats,
}

#[derive(Args, Debug)]
struct ReplyOpts {
    /// Reply time budget in milliseconds
    #[arg(long)]
    budget_ms: Option<u64>,
    /// Skip candidates longer than this many characters
    #[arg(long)]
    max_len: Option<usize>,
    /// Seed for reproducible pivot and walk choices
    #[arg(long)]
    seed: Option<u64>,
}

impl ReplyOpts {
    fn config(&self) -> BrainConfig {
        let mut config = BrainConfig::default();
        if let Some(ms) = self.budget_ms {
            config = config.with_budget_ms(ms);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.max_reply_len = self.max_len;
        config
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_brain(path: &Path, config: BrainConfig) -> Result<Brain> {
    if !path.exists() {
        bail!(
            "{} not found - create one with `brain --brain {} init`",
            path.display(),
            path.display()
        );
    }
    Brain::open_with(path, config).with_context(|| format!("opening {}", path.display()))
}

fn learn_files(brain: &mut Brain, files: &[PathBuf]) -> Result<usize> {
    let mut learned = 0;
    for path in files {
        if !is_supported_corpus(path) {
            println!("[◐] Skipping unsupported file: {}", path.display());
            continue;
        }

        println!("[◐] Learning from: {}", path.display());
        let texts = read_texts(path).with_context(|| format!("reading {}", path.display()))?;
        for text in texts {
            for line in lines(&text) {
                brain.learn(line);
                learned += 1;
                if learned % PROGRESS_EVERY_LINES == 0 {
                    println!("[◐] Progress: {} lines...", learned);
                }
            }
        }
    }
    Ok(learned)
}

/// Learn `files` into the brain at `brain_path`. Lines learned before a failing file
/// are still saved.
fn learn(brain_path: &Path, files: &[PathBuf]) -> Result<usize> {
    if let Some(missing) = files.iter().find(|path| !path.exists()) {
        bail!("File not found: {}", missing.display());
    }

    let mut brain = open_brain(brain_path, BrainConfig::default())?;
    let learned = learn_files(&mut brain, files);
    brain.close()?;
    learned
}

fn console(brain: &mut Brain) -> Result<()> {
    println!("Console mode. Type /exit to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "/exit" || trimmed == "/quit" {
            break;
        }

        brain.learn(trimmed);
        println!("{}", brain.reply(trimmed));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Init {
            order,
            tokenizer,
            stemmer,
            force,
        } => {
            if cli.brain.exists() && !force {
                bail!("{} already exists (use --force to replace it)", cli.brain.display());
            }
            Brain::init(&cli.brain, order, &tokenizer)?;
            if stemmer.is_some() {
                let mut brain = open_brain(&cli.brain, BrainConfig::default())?;
                brain.set_stemmer(stemmer.as_deref())?;
                brain.close()?;
            }
            println!("[✓] Brain created: {} (order {})", cli.brain.display(), order);
        }
        Command::Learn { files } => {
            let learned = learn(&cli.brain, &files)?;
            println!("[✓] Learned {} lines", learned);
        }
        Command::Reply { opts, text } => {
            let mut brain = open_brain(&cli.brain, opts.config())?;
            println!("{}", brain.reply(&text.join(" ")));
        }
        Command::Console { opts } => {
            let mut brain = open_brain(&cli.brain, opts.config())?;
            let result = console(&mut brain);
            brain.close()?;
            result?;
        }
        Command::SetStemmer { name } => {
            let mut brain = open_brain(&cli.brain, BrainConfig::default())?;
            let name = (!name.eq_ignore_ascii_case("none")).then_some(name.as_str());
            brain.set_stemmer(name)?;
            brain.close()?;
            println!("[✓] Stemmer set: {}", name.unwrap_or("none"));
        }
        Command::Stats => {
            let brain = open_brain(&cli.brain, BrainConfig::default())?;
            let graph = brain.graph();
            println!("order:     {}", graph.order());
            println!("tokenizer: {}", brain.tokenizer().name());
            println!(
                "stemmer:   {}",
                graph.stemmer().map_or("none", |s| s.name())
            );
            println!("tokens:    {}", graph.token_count());
            println!("nodes:     {}", graph.node_count());
            println!("edges:     {}", graph.edge_count());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use markov_brain::MemoryGraph;
    use std::fs;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let brain = dir.path().join("test.brain");
        Brain::init(&brain, 2, "cobe").expect("init");
        let good = dir.path().join("good.txt");
        fs::write(&good, "the quick brown fox jumps\n").expect("write");
        (dir, brain, good)
    }

    #[test]
    fn failed_file_keeps_earlier_lines() {
        let (dir, brain, good) = setup();
        let bad = dir.path().join("bad.zip");
        fs::write(&bad, "not a zip").expect("write");

        assert!(learn(&brain, &[good, bad]).is_err());
        let graph = MemoryGraph::open(&brain).expect("open");
        assert!(graph.token_id("fox").is_some());
        assert!(graph.edge_count() > 0);
    }

    #[test]
    fn missing_files_are_rejected_up_front() {
        let (dir, brain, good) = setup();
        let missing = dir.path().join("missing.txt");

        assert!(learn(&brain, &[good.clone(), missing]).is_err());
        assert_eq!(MemoryGraph::open(&brain).expect("open").edge_count(), 0);

        assert_eq!(learn(&brain, &[good]).expect("learn"), 1);
    }
}
