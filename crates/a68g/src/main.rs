// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Command line driver (F5): loads a source file (or wraps `--execute`/`--print` text
//! in a synthetic unit), parses, elaborates, and runs it, reporting any of the three
//! diagnostic taxonomies via `a68-human` and exiting non-zero on failure.

use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser as ClapParser;

use a68_core::{EngineLimits, SourceId};
use a68_core::limits::parse_size;
use a68_genie::Engine;
use a68_human::Diagnostic;
use a68_modes::decorate::elaborate;
use a68_syntax::parser::Parser as SourceParser;

/// Filename extensions tried, in order, when the positional argument doesn't open as
/// given (`algol68g.c`'s `whether_extension` probing order).
const EXTENSIONS: &[&str] = &[".a68", ".A68", ".a68g", ".A68G", ".algol68", ".ALGOL68", ".algol68g", ".ALGOL68G"];

/// An Algol 68 interpreter.
#[derive(Debug, ClapParser)]
#[command(name = "a68g", version, about)]
struct Args {
    /// Source file to run. Omit when using `--execute`/`--print`.
    source: Option<PathBuf>,

    /// Run this unit directly instead of reading a source file.
    #[arg(long, conflicts_with = "print_unit")]
    execute: Option<String>,

    /// Run `print((UNIT))` directly instead of reading a source file.
    #[arg(long = "print", value_name = "UNIT")]
    print_unit: Option<String>,

    /// Run every check but skip execution.
    #[arg(long)]
    check: bool,

    /// Frame stack size (accepts a k/M/G suffix).
    #[arg(long, value_name = "N")]
    stack: Option<String>,

    /// Heap size (accepts a k/M/G suffix).
    #[arg(long, value_name = "N")]
    heap: Option<String>,

    /// Maximum number of live heap handles (accepts a k/M/G suffix).
    #[arg(long, value_name = "N")]
    handles: Option<String>,

    /// Alias for `--stack` (the reference driver's name for the same region).
    #[arg(long, value_name = "N")]
    frame: Option<String>,

    /// Minimum significant digits for LONG LONG numeric modes.
    #[arg(long, value_name = "N")]
    precision: Option<u32>,

    /// Abort after N seconds of CPU time.
    #[arg(long, value_name = "N")]
    timelimit: Option<u64>,

    /// Log every executed unit's source position to stderr.
    #[arg(long)]
    trace: bool,

    /// Cancel a preceding `--trace` (last flag on the command line wins).
    #[arg(long)]
    notrace: bool,

    /// Evaluate `ASSERT` clauses (default).
    #[arg(long)]
    assertions: bool,

    /// Skip `ASSERT` clauses.
    #[arg(long)]
    noassertions: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let source_id = SourceId::new(0);
    let text = load_text(&args)?;

    let tree = match SourceParser::parse_program(&text, source_id) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{}", Diagnostic::from_parse_error(&err).render(&text));
            std::process::exit(1);
        }
    };

    let decorated = elaborate(tree);
    if !decorated.errors.is_empty() {
        for err in &decorated.errors {
            eprintln!("{}", Diagnostic::from_mode_error(err).render(&text));
        }
        std::process::exit(1);
    }

    if args.check {
        return Ok(());
    }

    let limits = build_limits(&args)?;
    let stdout: Box<dyn Write> = Box::new(io::stdout());
    let stdin = Box::new(BufReader::new(io::stdin()));
    let mut engine = Engine::new(decorated, limits, stdout, stdin);

    match engine.run() {
        Ok(_) => Ok(()),
        Err(err) => {
            eprintln!("{}", Diagnostic::from_runtime_error(&err).render(&text));
            std::process::exit(1);
        }
    }
}

/// Loads the program text: `--execute`/`--print` wrap their argument as a synthetic
/// unit, otherwise the positional filename is opened, trying each of [`EXTENSIONS`] in
/// turn when the bare name doesn't exist.
fn load_text(args: &Args) -> Result<String> {
    if let Some(unit) = &args.execute {
        return Ok(format!("{unit}"));
    }
    if let Some(unit) = &args.print_unit {
        return Ok(format!("print(({unit}))"));
    }
    let Some(source) = &args.source else {
        bail!("no source file given (and neither --execute nor --print was used)");
    };
    let path = resolve_source_path(source)?;
    fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

fn resolve_source_path(source: &Path) -> Result<PathBuf> {
    if source.exists() {
        return Ok(source.to_path_buf());
    }
    for ext in EXTENSIONS {
        let mut candidate = source.as_os_str().to_owned();
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!("cannot open source '{}'", source.display())
}

fn build_limits(args: &Args) -> Result<EngineLimits> {
    let mut limits = EngineLimits::default();
    if let Some(n) = &args.stack {
        limits.frame_stack_bytes = parse_size(n)?;
    }
    if let Some(n) = &args.frame {
        limits.frame_stack_bytes = parse_size(n)?;
    }
    if let Some(n) = &args.heap {
        limits.heap_bytes = parse_size(n)?;
    }
    if let Some(n) = &args.handles {
        limits.max_handles = parse_size(n)?;
    }
    if let Some(n) = args.precision {
        limits.precision = n;
    }
    if let Some(secs) = args.timelimit {
        limits.time_limit = Some(Duration::from_secs(secs));
    }
    if args.trace {
        limits.trace = true;
    }
    if args.notrace {
        limits.trace = false;
    }
    if args.noassertions {
        limits.assertions = false;
    }
    if args.assertions {
        limits.assertions = true;
    }
    Ok(limits)
}
