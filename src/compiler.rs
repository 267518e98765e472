//! Invoking version binaries
//!
//! The [`Compiler`] trait is the seam between triage logic and real
//! processes: the catalog builder and the campaign driver only ever see a
//! [`RawOutcome`], which lets tests substitute scripted outcomes.

use std::path::Path;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::process::{run_with_timeout, RawOutcome};

/// Runs `<binary> <input>` and captures what happened
pub trait Compiler {
    /// # Errors
    /// Transient errors ([`crate::error::TriageError::is_transient`]) when the
    /// binary cannot be started or times out.
    fn compile(&self, binary: &Path, input: &Path) -> Result<RawOutcome>;
}

/// Real subprocess-backed compiler
#[derive(Debug, Clone, Default)]
pub struct BinaryCompiler {
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl BinaryCompiler {
    pub fn new(args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { args, timeout }
    }
}

impl Compiler for BinaryCompiler {
    fn compile(&self, binary: &Path, input: &Path) -> Result<RawOutcome> {
        trace!(binary = %binary.display(), input = %input.display(), "compiling");
        run_with_timeout(binary, &self.args, Some(input), self.timeout)
    }
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, binary: &Path, input: &Path) -> Result<RawOutcome> {
        (**self).compile(binary, input)
    }
}
