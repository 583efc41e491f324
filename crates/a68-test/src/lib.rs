// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! Integration test harness utilities: a stateful runner that drives the same
//! parse -> elaborate -> execute pipeline the CLI driver does, and captures stdout for
//! assertions instead of writing to the process's own.
//!
//! Each test should build its own [`TestRun`] to keep heaps and frame stacks isolated,
//! the same way the reference codebase gives each test its own VM rather than sharing
//! one across a suite.

use std::io::{self, BufReader, Write};
use std::sync::{Arc, Mutex};

use a68_core::{EngineLimits, SourceId};
use a68_genie::Engine;
use a68_genie::error::RuntimeError;
use a68_modes::decorate::{self, DecoratedTree};
use a68_modes::error::ModeError;
use a68_syntax::parser::{ParseError, Parser};

/// Everything that can go wrong running a whole program through the pipeline.
#[derive(Debug)]
pub enum TestRunError {
    Parse(ParseError),
    Mode(Vec<ModeError>),
    Runtime(RuntimeError),
}

impl std::fmt::Display for TestRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestRunError::Parse(e) => write!(f, "parse error: {e}"),
            TestRunError::Mode(errs) => {
                write!(f, "{} mode error(s): ", errs.len())?;
                for (i, e) in errs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            TestRunError::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for TestRunError {}

/// A handle to a process-captured stdout, shared with the [`Engine`] it was built for.
#[derive(Clone, Default)]
struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("capture buffer poisoned").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A single-program test run: owns the decorated tree and engine built from it, and
/// the buffer its transput writes land in.
pub struct TestRun {
    engine: Engine,
    output: CapturedOutput,
}

impl TestRun {
    /// Parses and mode-checks `source`, failing fast on either error. Input for `read`/
    /// `readf` is always empty — tests that exercise input transput should build the
    /// engine by hand instead.
    ///
    /// # Errors
    /// Returns [`TestRunError::Parse`]/[`TestRunError::Mode`] if `source` doesn't make
    /// it through those two phases.
    pub fn new(source: &str) -> Result<Self, TestRunError> {
        Self::with_limits(source, EngineLimits::default())
    }

    pub fn with_limits(source: &str, limits: EngineLimits) -> Result<Self, TestRunError> {
        let decorated = decorate_source(source)?;
        let output = CapturedOutput::default();
        let stdout: Box<dyn Write> = Box::new(output.clone());
        let stdin: Box<dyn std::io::BufRead> = Box::new(BufReader::new(io::empty()));
        let engine = Engine::new(decorated, limits, stdout, stdin);
        Ok(Self { engine, output })
    }

    /// Runs the whole program to completion, returning everything written to stdout.
    ///
    /// # Errors
    /// Returns [`TestRunError::Runtime`] if the program raises an uncaught runtime
    /// error.
    pub fn run(&mut self) -> Result<String, TestRunError> {
        self.engine.run().map_err(TestRunError::Runtime)?;
        Ok(self.stdout())
    }

    /// Snapshot of everything written to stdout so far, valid before and after `run`.
    #[must_use]
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.0.lock().expect("capture buffer poisoned")).into_owned()
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

/// Parses and elaborates `source` in one step, collecting mode errors into a single
/// variant rather than `a68g`'s line-by-line CLI rendering.
pub fn decorate_source(source: &str) -> Result<DecoratedTree, TestRunError> {
    let tree = Parser::parse_program(source, SourceId::new(0)).map_err(TestRunError::Parse)?;
    let decorated = decorate::elaborate(tree);
    if !decorated.errors.is_empty() {
        return Err(TestRunError::Mode(decorated.errors.clone()));
    }
    Ok(decorated)
}

/// Convenience one-shot: parses, elaborates, and runs `source` with default limits,
/// returning its captured stdout.
///
/// # Errors
/// Returns whichever of the three pipeline phases first fails.
pub fn run_source(source: &str) -> Result<String, TestRunError> {
    TestRun::new(source)?.run()
}

#[cfg(test)]
mod lib_test;
