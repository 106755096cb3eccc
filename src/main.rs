use clap::Parser as ClapParser;
use sprig::{Accessor, Builtins, Evaluator, Value};
use std::fs;
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "sprig")]
#[command(about = "Sprig - query, update, and delete paths in JSON documents")]
#[command(version)]
struct Cli {
    /// The selector expression to apply
    expression: String,

    /// JSON input file (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate selector syntax, don't evaluate
    #[arg(long)]
    syntax_only: bool,

    /// Set the selected location to this JSON value and print the whole
    /// document
    #[arg(long, value_name = "JSON", conflicts_with = "delete")]
    set: Option<String>,

    /// Delete the selected location and print the whole document
    #[arg(long)]
    delete: bool,
}

/// Errors that can occur during CLI operations
#[derive(Debug)]
enum CliError {
    /// Selector syntax error
    Parse(sprig::ParseError),
    /// Evaluation error
    Eval(sprig::EvalError),
    /// Accessor error from --set / --delete
    Access(sprig::AccessError),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Access(e) => write!(f, "Access error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Use --input or pipe JSON to stdin."),
        }
    }
}

impl From<sprig::ParseError> for CliError {
    fn from(e: sprig::ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<sprig::EvalError> for CliError {
    fn from(e: sprig::EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<sprig::AccessError> for CliError {
    fn from(e: sprig::AccessError) -> Self {
        CliError::Access(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let expr = sprig::parse(&cli.expression)?;

    if cli.syntax_only {
        println!("Syntax is valid");
        return Ok(());
    }

    let input = read_input(cli.input)?;
    let mut doc = Value::from_json_str(&input)?;

    let output = if let Some(json) = &cli.set {
        let value = Value::from_json_str(json)?;
        Accessor::new(&expr).set_strict(&mut doc, value)?;
        doc
    } else if cli.delete {
        Accessor::new(&expr).delete_strict(&mut doc)?;
        doc
    } else {
        let builtins = Builtins::new();
        Evaluator::new(&builtins).evaluate(&expr, &doc)?
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output.to_json())
    } else {
        serde_json::to_string(&output.to_json())
    }?;
    println!("{}", json);
    Ok(())
}

fn read_input(path: Option<String>) -> Result<String, CliError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}
