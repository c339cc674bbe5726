use anyhow::{anyhow, Context, Result};
use beatmenu::library::MENU_EXTENSION;
use beatmenu::validation::{MenuValidator, Severity, ValidationEvent};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    match run() {
        Ok(result) => {
            if result.summary.errors > 0 || (result.fail_on_warn && result.summary.warnings > 0) {
                process::exit(2);
            }
        }
        Err(err) => {
            eprintln!("menu_check error: {err:?}");
            process::exit(1);
        }
    }
}

#[derive(Default, Serialize)]
struct RunSummary {
    checked: usize,
    warnings: usize,
    errors: usize,
}

struct RunResult {
    summary: RunSummary,
    fail_on_warn: bool,
}

struct CliOptions {
    fail_on_warn: bool,
    report_stats: bool,
    show_help: bool,
    targets: Vec<String>,
}

fn run() -> Result<RunResult> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_cli_args(&args)?;
    if options.show_help {
        print_usage();
        return Ok(RunResult { summary: RunSummary::default(), fail_on_warn: options.fail_on_warn });
    }
    let targets = collect_targets(&options.targets)?;
    if targets.is_empty() {
        return Err(anyhow!("no menu documents found in provided paths"));
    }
    let validator = MenuValidator::default();
    let mut summary = RunSummary::default();
    for path in targets {
        summary.checked += 1;
        for event in validator.validate_path(&path) {
            report_event(&event);
            if options.report_stats {
                report_event_json(&event);
            }
            match event.severity {
                Severity::Warning => summary.warnings += 1,
                Severity::Error => summary.errors += 1,
                Severity::Info => {}
            }
        }
    }
    println!("Checked {} menus ({} warnings, {} errors)", summary.checked, summary.warnings, summary.errors);
    if options.report_stats {
        println!("{}", json!({ "summary": summary }));
    }
    Ok(RunResult { summary, fail_on_warn: options.fail_on_warn })
}

fn print_usage() {
    eprintln!(
        "Menu Check

Usage:
  menu_check [--fail-on-warn] [--report-stats] <path> [<path>...]

Each <path> may be a file or directory. Directories are walked recursively
and JSON menu documents are validated. Use --fail-on-warn to treat warnings
as errors (exit code 2).
"
    );
}

fn parse_cli_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions { fail_on_warn: false, report_stats: false, show_help: false, targets: Vec::new() };
    for arg in args {
        match arg.as_str() {
            "--fail-on-warn" => options.fail_on_warn = true,
            "--report-stats" => options.report_stats = true,
            "--help" | "-h" => options.show_help = true,
            _ if arg.starts_with("--") => {
                return Err(anyhow!("unknown flag '{arg}'"));
            }
            _ => options.targets.push(arg.clone()),
        }
    }
    Ok(options)
}

fn collect_targets(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(anyhow!("path '{}' does not exist", input));
        }
        if path.is_file() {
            if is_menu_document(&path) {
                add_target(path, &mut seen, &mut files);
            } else {
                eprintln!("[menu_check] skipping '{}' (unsupported extension)", path.display());
            }
        } else if path.is_dir() {
            walk_dir(&path, &mut seen, &mut files)
                .with_context(|| format!("failed to enumerate directory '{}'", path.display()))?;
        } else {
            return Err(anyhow!("path '{}' is neither file nor directory", input));
        }
    }
    Ok(files)
}

fn walk_dir(dir: &Path, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.path());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, seen, files)?;
        } else if is_menu_document(&path) {
            add_target(path, seen, files);
        }
    }
    Ok(())
}

fn add_target(path: PathBuf, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    let normalized = fs::canonicalize(&path).unwrap_or(path);
    if seen.insert(normalized.clone()) {
        files.push(normalized);
    }
}

fn is_menu_document(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case(MENU_EXTENSION))
}

fn report_event(event: &ValidationEvent) {
    let severity = match event.severity {
        Severity::Info => "INFO",
        Severity::Warning => "WARN",
        Severity::Error => "ERROR",
    };
    println!("[{severity}] {} - {}", event.path.display(), event.message);
}

fn report_event_json(event: &ValidationEvent) {
    let json_value = json!({
        "severity": event.severity.to_string(),
        "path": event.path.display().to_string(),
        "message": event.message,
    });
    println!("{json_value}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_handles_fail_on_warn() {
        let args = vec!["--fail-on-warn".to_string(), "menus".to_string()];
        let opts = parse_cli_args(&args).expect("parse args");
        assert!(opts.fail_on_warn);
        assert!(!opts.report_stats);
        assert_eq!(opts.targets, vec!["menus".to_string()]);
    }

    #[test]
    fn parse_args_errors_on_unknown_flag() {
        let args = vec!["--strict".to_string()];
        assert!(parse_cli_args(&args).is_err());
    }

    #[test]
    fn only_json_files_are_menu_documents() {
        assert!(is_menu_document(Path::new("menus/main.json")));
        assert!(is_menu_document(Path::new("menus/Main.JSON")));
        assert!(!is_menu_document(Path::new("menus/readme.md")));
    }
}
