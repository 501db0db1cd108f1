use arcorg_core::ErrorCategory as CoreCategory;
use colored::*;
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Directory,
    Filesystem,
    Conflict,
    Timeout,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    DirectoryError = 3,
    FilesystemError = 4,
    Conflict = 5,
    Timeout = 6,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

impl CliError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(ErrorCategory::General, message)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        Self::new(ErrorCategory::Misuse, message)
            .with_suggestion("Run 'arcorg --help' for usage information")
    }

    /// Create an error for a resource key that is not declared or managed
    pub fn unknown_resource(key: &str, known: &[String]) -> Self {
        let mut error = Self::new(ErrorCategory::Misuse, &format!("Unknown resource: {key}"));

        // Simple typo detection
        if let Some(closest) = known
            .iter()
            .filter(|candidate| levenshtein_distance(key, candidate) <= 2)
            .min_by_key(|candidate| levenshtein_distance(key, candidate))
        {
            error
                .suggestions
                .push(format!("Did you mean '{closest}'?"));
        }
        error
            .suggestions
            .push("Run 'arcorg show' to list managed resources".to_string());
        error
    }

    /// Create a directory error
    pub fn directory(message: &str) -> Self {
        Self::new(ErrorCategory::Directory, message)
            .with_suggestion("Check your AWS credentials and region")
            .with_suggestion("Verify the caller may use the Organizations API")
    }

    /// Create a filesystem error
    pub fn filesystem(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Filesystem, message);

        if message.contains("not found") || message.contains("No such file") {
            error
                .suggestions
                .push("Check if the file exists".to_string());
            error
                .suggestions
                .push("Pass --manifest or --state to point at another file".to_string());
        } else if message.contains("permission") || message.contains("denied") {
            error.suggestions.push("Check file permissions".to_string());
        }

        error
    }

    /// Create an error from a lifecycle library error
    pub fn from_core(error: arcorg_core::Error) -> Self {
        let category = match error.category() {
            CoreCategory::Directory => ErrorCategory::Directory,
            CoreCategory::Conflict => ErrorCategory::Conflict,
            CoreCategory::Timeout => ErrorCategory::Timeout,
            CoreCategory::Validation => ErrorCategory::Misuse,
            CoreCategory::CreationFailed | CoreCategory::MoveFailed => ErrorCategory::General,
        };

        let mut cli_error = Self::new(category, &error.to_string())
            .with_context("category", &error.category().to_string())
            .with_suggestion(error.remediation());
        if error.is_retryable() {
            cli_error = cli_error.with_suggestion("The operation may succeed if retried");
        }
        cli_error.source = Some(Box::new(error));
        cli_error
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Directory => ExitCode::DirectoryError,
            ErrorCategory::Filesystem => ExitCode::FilesystemError,
            ErrorCategory::Conflict => ExitCode::Conflict,
            ErrorCategory::Timeout => ExitCode::Timeout,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Directory => "Directory Error",
            ErrorCategory::Filesystem => "File Error",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::Timeout => "Timeout",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::Conflict => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

impl From<arcorg_core::Error> for CliError {
    fn from(error: arcorg_core::Error) -> Self {
        Self::from_core(error)
    }
}

/// Convert anyhow errors to CLI errors
///
/// Library and IO errors anywhere in the chain keep their category.
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli) => return cli,
            Err(error) => error,
        };
        let message = format!("{error:#}");

        match error.downcast::<arcorg_core::Error>() {
            Ok(core) => Self::from_core(core),
            Err(error) => {
                let category = error.chain().find_map(|cause| {
                    cause
                        .downcast_ref::<io::Error>()
                        .map(|_| ErrorCategory::Filesystem)
                });
                match category {
                    Some(_) => Self::filesystem(&message),
                    None => Self::general(&message),
                }
            }
        }
    }
}

/// Simple Levenshtein distance for resource key suggestions
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();
    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate().take(len2 + 1) {
        *cell = j;
    }

    for (i, c1) in s1_chars.iter().enumerate() {
        let i1 = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let j1 = j + 1;
            let cost = if c1 == c2 { 0 } else { 1 };
            matrix[i1][j1] = std::cmp::min(
                std::cmp::min(matrix[i][j1] + 1, matrix[i1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[len1][len2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcorg_core::error::{DirectoryError, LifecycleError};

    #[test]
    fn test_conflict_maps_to_conflict_exit_code() {
        let error: CliError =
            arcorg_core::Error::from(LifecycleError::pending_closure("111122223333", "a@b.c"))
                .into();
        assert_eq!(error.exit_code(), ExitCode::Conflict);
        assert!(!error.suggestions.is_empty());
    }

    #[test]
    fn test_directory_error_maps_to_directory_exit_code() {
        let error: CliError =
            arcorg_core::Error::from(DirectoryError::throttled("ListAccounts")).into();
        assert_eq!(error.exit_code(), ExitCode::DirectoryError);
        assert!(
            error
                .suggestions
                .iter()
                .any(|s| s.contains("may succeed if retried"))
        );
    }

    #[test]
    fn test_anyhow_keeps_core_category() {
        let core = arcorg_core::Error::from(LifecycleError::CreationTimedOut {
            ticket_id: "car-1".to_string(),
            attempts: 60,
        });
        let error = CliError::from(anyhow::Error::new(core));
        assert_eq!(error.exit_code(), ExitCode::Timeout);
    }

    #[test]
    fn test_anyhow_io_error_is_filesystem() {
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let error = CliError::from(anyhow::Error::new(io).context("Failed to read manifest"));
        assert_eq!(error.exit_code(), ExitCode::FilesystemError);
    }

    #[test]
    fn test_unknown_resource_suggests_close_key() {
        let known = vec!["sandbox".to_string(), "production".to_string()];
        let error = CliError::unknown_resource("sandbx", &known);
        assert_eq!(error.exit_code(), ExitCode::Misuse);
        assert_eq!(error.suggestions[0], "Did you mean 'sandbox'?");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("apply", "aply"), 1);
        assert_eq!(levenshtein_distance("plan", "plan"), 0);
    }
}
