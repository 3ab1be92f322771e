use minitt::config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
minitt — a minimal dependent type theory elaborator

USAGE:
    minitt [OPTIONS] [FILES...]

OPTIONS:
    -h, --help       print this help text
    -v, --version    print the version
        --repl       start an interactive REPL instead of elaborating files
        --quiet      suppress per-declaration [elaborate]/[normalize] output
    -o FILE          write reported output to FILE instead of stdout

If no FILES are given and stt.toml names a [project] sources list, those
files are elaborated instead.";

struct Args {
    repl: bool,
    quiet: bool,
    out: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args { repl: false, quiet: false, out: None, files: Vec::new() };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            "-v" | "--version" => {
                println!("minitt {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--repl" => args.repl = true,
            "--quiet" => args.quiet = true,
            "-o" => {
                let path = iter.next().ok_or_else(|| "-o requires a FILE argument".to_string())?;
                args.out = Some(PathBuf::from(path));
            }
            other if other.starts_with('-') => {
                return Err(format!("unrecognized option '{}'", other));
            }
            other => args.files.push(PathBuf::from(other)),
        }
    }
    Ok(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    init_tracing();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("minitt: {}", e);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    if args.repl {
        return match minitt::repl::run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("minitt: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match Config::discover(&cwd) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("minitt: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let files = if args.files.is_empty() {
        config.resolved_sources(&cwd)
    } else {
        args.files.clone()
    };

    if files.is_empty() {
        eprintln!("minitt: no input files given and none configured in stt.toml");
        return ExitCode::FAILURE;
    }

    let mut output = String::new();
    for file in &files {
        match run_file(file, &config) {
            Ok(text) => {
                if !args.quiet {
                    output.push_str(&text);
                }
            }
            Err(e) => {
                eprintln!("minitt: {}: {}", file.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    match &args.out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, output) {
                eprintln!("minitt: writing {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
        None => print!("{}", output),
    }

    ExitCode::SUCCESS
}

fn run_file(path: &Path, config: &Config) -> Result<String, String> {
    let span = tracing::debug_span!("elaborate_file", file = %path.display());
    let _enter = span.enter();
    let reports = minitt::elaborate_file_with_config(path, config).map_err(|e| e.to_string())?;
    let mut out = String::new();
    for report in reports {
        if let Some(elaborated) = report.elaborated {
            out.push_str(&format!("{}: {}\n", report.name, elaborated));
        }
        if let Some(nf) = report.normal_form {
            out.push_str(&format!("{} normal form: {}\n", report.name, nf));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repl_and_quiet_flags() {
        let args = parse_args(&["--repl".to_string(), "--quiet".to_string()]).unwrap();
        assert!(args.repl);
        assert!(args.quiet);
    }

    #[test]
    fn parses_output_file_flag() {
        let args = parse_args(&["-o".to_string(), "out.txt".to_string()]).unwrap();
        assert_eq!(args.out, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn unknown_option_is_rejected() {
        assert!(parse_args(&["--nope".to_string()]).is_err());
    }

    #[test]
    fn positional_arguments_collect_as_files() {
        let args = parse_args(&["a.stt".to_string(), "b.stt".to_string()]).unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.stt"), PathBuf::from("b.stt")]);
    }
}
