//! Ordered operation sequences and their compilation from request options.

mod compiler;

pub use compiler::{compile, CompiledPipeline, RequestOptions, RECOGNIZED_PARAMS};

use crate::operation::{Operation, OutputFormat};
use mediaform_core::AppError;

/// Version tag mixed into every canonical encoding. Bump it whenever an
/// operation's pixel output changes so stale cache entries stop matching.
const ENCODING_VERSION: &str = "v1";

/// Validated, ordered sequence of operations plus the declared output format
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    operations: Vec<Operation>,
    output: OutputFormat,
}

impl Pipeline {
    /// Build a non-empty pipeline.
    ///
    /// Operations must already be in canonical order with no kind repeated.
    /// The output format is the `FormatConvert` target when present,
    /// otherwise `default_output`.
    pub fn new(operations: Vec<Operation>, default_output: OutputFormat) -> Result<Self, AppError> {
        if operations.is_empty() {
            return Err(AppError::InvalidRequest(
                "pipeline has no operations; use the identity pipeline".to_string(),
            ));
        }

        for pair in operations.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.rank() == next.rank() {
                return Err(AppError::InvalidRequest(format!(
                    "operation '{}' appears more than once",
                    next.name()
                )));
            }
            if prev.rank() > next.rank() {
                return Err(AppError::InvalidRequest(format!(
                    "operation '{}' cannot follow '{}'",
                    next.name(),
                    prev.name()
                )));
            }
        }

        let output = match operations.last() {
            Some(Operation::FormatConvert(target)) => *target,
            _ => default_output,
        };

        Ok(Self { operations, output })
    }

    /// Pipeline that hands back the source unchanged
    pub fn identity(output: OutputFormat) -> Self {
        Self {
            operations: Vec::new(),
            output,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    /// Dimensions of the final frame for a source of the given size
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        self.operations
            .iter()
            .fold((width, height), |(w, h), op| op.output_dimensions(w, h))
    }

    /// Deterministic text form: equal pipelines always encode equally
    pub fn canonical_encoding(&self) -> String {
        let body = if self.is_identity() {
            "identity".to_string()
        } else {
            self.operations
                .iter()
                .map(Operation::canonical)
                .collect::<Vec<_>>()
                .join("/")
        };
        format!("{}|{}|out={}", ENCODING_VERSION, body, self.output.name())
    }
}
