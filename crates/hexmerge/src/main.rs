//! CLI entry point for the hexmerge binary.
//!
//! Thin I/O glue around `ihex-core`: reads the input files, folds them into
//! one image in argument order (later inputs override earlier ones), and
//! writes the merged hex text to a file or stdout.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;

use ihex_core::{parse_str, write_string, MemoryImage};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: hexmerge -i <input>... [-o <output>]

Options:
  -i, --input <file>...  Input hex files, in override order (later wins)
  -o, --output <file>    Output hex file (default `-` = stdout)
  -h, --help             Show this help message

Examples:
  hexmerge -i boot.hex app.hex
  hexmerge -i boot.hex app.hex settings.hex -o firmware.hex
";

#[derive(Debug, PartialEq, Eq)]
struct MergeArgs {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
}

impl MergeArgs {
    fn writes_to_stdout(&self) -> bool {
        match &self.output {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}

#[derive(Debug)]
enum ParseResult {
    Args(MergeArgs),
    Help,
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut inputs = Vec::new();
    let mut output: Option<PathBuf> = None;
    let mut collecting_inputs = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "-i" || arg == "--input" {
            collecting_inputs = true;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            if output.is_some() {
                return Err("multiple output paths provided".to_string());
            }
            output = Some(PathBuf::from(value));
            collecting_inputs = false;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') && arg != "-" {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if collecting_inputs {
            inputs.push(PathBuf::from(arg));
            continue;
        }

        return Err(format!("unexpected argument: {}", arg.to_string_lossy()));
    }

    if inputs.is_empty() {
        return Err("at least one input file is required (-i)".to_string());
    }

    Ok(ParseResult::Args(MergeArgs { inputs, output }))
}

fn merge_inputs(args: &MergeArgs) -> Result<MemoryImage, i32> {
    let mut merged = MemoryImage::new();
    for path in &args.inputs {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) => {
                eprintln!("error: {}: {error}", path.display());
                return Err(1);
            }
        };
        let image = match parse_str(&text) {
            Ok(image) => image,
            Err(error) => {
                eprintln!("error: {}: {error}", path.display());
                return Err(1);
            }
        };
        merged.merge(&image);
    }
    Ok(merged)
}

fn run(args: &MergeArgs) -> Result<(), i32> {
    let merged = merge_inputs(args)?;

    let text = match write_string(&merged) {
        Ok(text) => text,
        Err(error) => {
            eprintln!("error: {error}");
            return Err(1);
        }
    };

    if args.writes_to_stdout() {
        // A closed pipe on stdout is not an error for this tool.
        if let Err(error) = io::stdout().write_all(text.as_bytes()) {
            if error.kind() != io::ErrorKind::BrokenPipe {
                eprintln!("error: failed to write output: {error}");
                return Err(1);
            }
        }
    } else if let Some(path) = &args.output {
        if let Err(error) = fs::write(path, &text) {
            eprintln!("error: {}: {error}", path.display());
            return Err(1);
        }
    }

    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Args(args)) => match run(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::{parse_args, MergeArgs, ParseResult};
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Result<ParseResult, String> {
        parse_args(args.iter().map(OsString::from))
    }

    fn expect_args(result: Result<ParseResult, String>) -> MergeArgs {
        match result.expect("arguments should parse") {
            ParseResult::Args(args) => args,
            ParseResult::Help => panic!("expected parsed arguments, got help"),
        }
    }

    #[test]
    fn parses_inputs_and_output() {
        let args = expect_args(parse(&["-i", "a.hex", "b.hex", "-o", "out.hex"]));
        assert_eq!(
            args,
            MergeArgs {
                inputs: vec![PathBuf::from("a.hex"), PathBuf::from("b.hex")],
                output: Some(PathBuf::from("out.hex")),
            }
        );
        assert!(!args.writes_to_stdout());
    }

    #[test]
    fn defaults_to_stdout_without_output_flag() {
        let args = expect_args(parse(&["-i", "a.hex"]));
        assert_eq!(args.output, None);
        assert!(args.writes_to_stdout());
    }

    #[test]
    fn dash_output_means_stdout() {
        let args = expect_args(parse(&["-i", "a.hex", "-o", "-"]));
        assert_eq!(args.output, Some(PathBuf::from("-")));
        assert!(args.writes_to_stdout());
    }

    #[test]
    fn accepts_repeated_input_flags() {
        let args = expect_args(parse(&["-i", "a.hex", "-i", "b.hex", "c.hex"]));
        assert_eq!(args.inputs.len(), 3);
    }

    #[test]
    fn requires_at_least_one_input() {
        let error = parse(&["-o", "out.hex"]).expect_err("missing inputs should fail");
        assert!(error.contains("input"));

        let error = parse(&["-i"]).expect_err("empty input list should fail");
        assert!(error.contains("input"));
    }

    #[test]
    fn rejects_unknown_options_and_stray_arguments() {
        let error = parse(&["-i", "a.hex", "--fast"]).expect_err("unknown option should fail");
        assert!(error.contains("unknown option"));

        let error = parse(&["a.hex"]).expect_err("stray positional should fail");
        assert!(error.contains("unexpected argument"));
    }

    #[test]
    fn rejects_output_without_value_or_repeated_output() {
        let error = parse(&["-i", "a.hex", "-o"]).expect_err("dangling -o should fail");
        assert!(error.contains("missing value"));

        let error = parse(&["-i", "a.hex", "-o", "x", "-o", "y"])
            .expect_err("repeated -o should fail");
        assert!(error.contains("multiple output"));
    }

    #[test]
    fn help_flag_wins() {
        let result = parse(&["--help"]).expect("help should parse");
        assert!(matches!(result, ParseResult::Help));
    }
}
