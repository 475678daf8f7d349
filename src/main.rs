use std::fs;
use std::path::PathBuf;

use adder::lex::LexError;
use adder::{LexMode, Lexer, ParserOptions, Token};
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use miette::IntoDiagnostic;
use miette::WrapErr;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Tokenize and parse chained integer additions")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print one token per line.
    Tokenize {
        #[command(flatten)]
        input: Input,
    },
    /// Print the syntax tree.
    Parse {
        #[command(flatten)]
        input: Input,

        #[arg(long, value_enum, default_value_t = Format::Tree)]
        format: Format,

        /// Most operators one expression may chain.
        #[arg(long, default_value_t = ParserOptions::default().max_depth)]
        max_depth: usize,
    },
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
struct Source {
    filename: Option<PathBuf>,

    /// Source text to use instead of a file.
    #[arg(short, long)]
    expr: Option<String>,
}

#[derive(Debug, clap::Args)]
struct Input {
    #[command(flatten)]
    source: Source,

    /// Fail on characters that start no token instead of dropping them.
    #[arg(long)]
    strict: bool,
}

impl Input {
    fn read(&self) -> miette::Result<(String, String)> {
        match (&self.source.filename, &self.source.expr) {
            (_, Some(expr)) => Ok(("<expr>".to_string(), expr.clone())),
            (Some(filename), None) => {
                let contents = fs::read_to_string(filename)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
                Ok((filename.display().to_string(), contents))
            }
            (None, None) => Err(miette::miette!("no input given")),
        }
    }

    fn mode(&self) -> LexMode {
        if self.strict {
            LexMode::Strict
        } else {
            LexMode::Lenient
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Tree,
    Json,
}

fn lex<'de>(name: &'de str, contents: &'de str, mode: LexMode) -> Vec<Token<'de>> {
    match Lexer::new(Some(name), contents).with_mode(mode).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            if let Some(LexError::UnrecognizedCharacter(error)) = e.downcast_ref::<LexError>() {
                eprintln!(
                    "[line {}] Error: Unexpected character: {}",
                    error.line(),
                    error.token
                );
            }
            eprintln!("{e:?}");

            std::process::exit(65);
        }
    }
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Tokenize { input } => {
            let (name, contents) = input.read()?;
            for token in lex(&name, &contents, input.mode()) {
                println!("{token}");
            }
        }
        Commands::Parse {
            input,
            format,
            max_depth,
        } => {
            let (name, contents) = input.read()?;
            let tokens = lex(&name, &contents, input.mode());

            let program = adder::Parser::new(&tokens)
                .with_source(Some(name.as_str()), &contents)
                .with_options(ParserOptions { max_depth })
                .parse()?;

            match format {
                Format::Tree => print!("{program}"),
                Format::Json => {
                    let json = serde_json::to_string_pretty(&program)
                        .into_diagnostic()
                        .wrap_err("serializing the syntax tree failed")?;
                    println!("{json}");
                }
            }
        }
    }
    Ok(())
}
