//! User-facing diagnostic messages.
//!
//! Errors are printed as a primary message, the facts that led to it, and
//! what to try next.

use std::fmt;

use crate::core::errors::BuildError;

/// Common suggestion messages.
pub mod suggestions {
    /// Suggestion when the repository has no CMakeLists.txt.
    pub const NO_CMAKELISTS: &str = "pass --repo_dir pointing at a CMake project";

    /// Suggestion when the wrapped build fails.
    pub const BUILD_FAILED: &str =
        "re-run with --build_with_ninja_verbose or --build_with_ninja_explain";

    /// Suggestion when the container engine is missing.
    pub const NO_ENGINE: &str = "install rootless docker or podman, or pass --engine";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", label, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Print a top-level error and return the process exit code for it.
///
/// Pipeline errors get the full diagnostic and mirror a failed child's
/// exit status; anything else is printed with its context chain.
pub fn report_error(err: &anyhow::Error, color: bool) -> i32 {
    match err.downcast_ref::<BuildError>() {
        Some(build_err) => {
            let message = build_err.to_string();
            let mut diag = build_err.to_diagnostic();
            for cause in err.chain().map(|c| c.to_string()).filter(|c| *c != message) {
                diag = diag.with_context(cause);
            }
            emit(&diag, color);
            build_err.exit_code()
        }
        None => {
            emit(&Diagnostic::error(format!("{:#}", err)), color);
            1
        }
    }
}
