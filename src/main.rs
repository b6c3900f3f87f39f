use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use loxwalk::ast_printer::{AstPrinter, RpnPrinter};
use loxwalk::error::{ErrorSink, StderrSink};
use loxwalk::{Interpreter, Outcome, Parser, Scanner};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the expression in reverse Polish notation
        #[arg(long, conflicts_with = "json")]
        rpn: bool,

        /// Parse the file as a whole program and dump its AST as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },
}

/// Maps `filename` into memory. The map must outlive every token borrowed
/// from it.
fn map_file(filename: &Path) -> Result<Mmap> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    // SAFETY: the file is only read, and nothing in this process writes it.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);
    Ok(map)
}

fn as_source<'m>(map: &'m Mmap, filename: &Path) -> Result<&'m str> {
    std::str::from_utf8(map).with_context(|| format!("{:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'loxwalk::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxwalk::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize<W: Write>(source: &str, out: &mut W) -> Result<i32> {
    let mut sink = StderrSink::default();

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                writeln!(out, "{}", token).context("Failed to write token")?;
            }
            Err(e) => sink.report(e),
        }
    }

    if sink.had_error {
        debug!("Tokenization failed, exiting with code 65");
        return Ok(Outcome::StaticError.exit_code());
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(source: &str, rpn: bool, json: bool) -> Result<i32> {
    let mut sink = StderrSink::default();
    let (tokens, errors) = Scanner::new(source).scan_all();
    let lexed = errors.is_empty();
    errors.into_iter().for_each(|e| sink.report(e));

    let mut parser = Parser::new(&tokens);

    if json {
        let program = match parser.parse() {
            Ok(program) => program,
            Err(errors) => {
                errors.into_iter().for_each(|e| sink.report(e));
                return Ok(Outcome::StaticError.exit_code());
            }
        };
        if !lexed {
            return Ok(Outcome::StaticError.exit_code());
        }

        let dump = serde_json::to_string_pretty(&program).context("Failed to serialize AST")?;
        println!("{}", dump);
        return Ok(0);
    }

    let expr = match parser.parse_expression() {
        Ok(expr) => expr,
        Err(e) => {
            sink.report(e);
            return Ok(Outcome::StaticError.exit_code());
        }
    };
    if !lexed {
        return Ok(Outcome::StaticError.exit_code());
    }

    let printed = if rpn {
        RpnPrinter::print(&expr)
    } else {
        AstPrinter::print(&expr)
    };
    debug!("AST: {}", printed);
    println!("{}", printed);
    Ok(0)
}

fn evaluate(source: &str) -> i32 {
    let mut sink = StderrSink::default();
    let (tokens, errors) = Scanner::new(source).scan_all();
    let lexed = errors.is_empty();
    errors.into_iter().for_each(|e| sink.report(e));

    let expr = match Parser::new(&tokens).parse_expression() {
        Ok(expr) => expr,
        Err(e) => {
            sink.report(e);
            return Outcome::StaticError.exit_code();
        }
    };
    if !lexed {
        return Outcome::StaticError.exit_code();
    }

    let mut interpreter = Interpreter::new();
    if interpreter.interpret_expression(&expr, &mut sink) {
        0
    } else {
        Outcome::RuntimeError.exit_code()
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code = match args.commands {
        Commands::Tokenize { filename } => {
            info!("Running Tokenize subcommand");
            let map = map_file(&filename)?;
            tokenize(as_source(&map, &filename)?, &mut io::stdout().lock())?
        }

        Commands::Parse {
            filename,
            rpn,
            json,
        } => {
            info!("Running Parse subcommand");
            let map = map_file(&filename)?;
            parse(as_source(&map, &filename)?, rpn, json)?
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");
            let map = map_file(&filename)?;
            evaluate(as_source(&map, &filename)?)
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");
            let map = map_file(&filename)?;
            let source = as_source(&map, &filename)?;
            debug!("Provided input:\n{}", source);

            let mut sink = StderrSink::default();
            let outcome = loxwalk::run(source, io::stdout(), &mut sink);
            info!("Run finished: {:?}", outcome);
            outcome.exit_code()
        }
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        process::exit(code);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tokenize_writes_one_line_per_token() {
        let mut out = Vec::new();
        assert_eq!(tokenize("var x;", &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "VAR var null\nIDENTIFIER x null\nSEMICOLON ; null\nEOF  null\n"
        );
    }

    #[test]
    fn tokenize_reports_a_failed_write() {
        let err = tokenize("print 1;", &mut ClosedPipe).unwrap_err();
        assert_eq!(err.to_string(), "Failed to write token");
        let io_err = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
    }
}
