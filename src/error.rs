//! # Error Handling
//!
//! This module provides the error type shared by every layer of the editing
//! engine, featuring per-variant error context, severity classification and
//! recovery hints.
//!
//! ## Architecture
//!
//! - **Error Types**: One enum, [`CraftError`], with a variant per failure class
//! - **Error Context**: Timestamp, operation, free-form context, recovery suggestion,
//!   severity and metadata attached to every variant
//! - **Error Traits**: [`HasSeverity`], [`HasRecoverySuggestion`] and [`Recoverable`]
//! - **Error Chaining**: Proper `source()` tracking for wrapped I/O and library errors
//!
//! ## Failure Classes
//!
//! | Variant | Raised when | Engine effect |
//! |---------|-------------|---------------|
//! | `Decode` | the source image cannot be read | initialization fails, engine unusable |
//! | `Processing` | the pixel kernel fails | frame dropped, previous preview stays |
//! | `NotReady` | display/export issued before initialization completes | rejected |
//! | `InitFailed` | any operation waits on a failed initialization | terminal |
//!
//! Operations issued after `release()` never produce an error; they are no-ops.
//!
//! ## Usage
//!
//! ```rust
//! use imgcraft::error::{CraftError, ErrorSeverity, HasSeverity};
//!
//! let error = CraftError::processing("render", "kernel rejected buffer")
//!     .with_context("rendering preview at 1080x810")
//!     .with_recovery_suggestion("the previous preview remains visible");
//!
//! assert_eq!(error.category(), "processing");
//! assert_eq!(error.severity(), ErrorSeverity::Error);
//! ```

use std::{error::Error as StdError, fmt, sync::Arc, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Debug-level errors that don't affect operation
    Debug,
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    /// Critical errors that require immediate attention
    Critical,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// Core error context containing metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Whether this error is recoverable
    pub recoverable: bool,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            recoverable: false,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation that was being performed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add additional context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}

/// Base error type for the editing engine
#[derive(Debug)]
pub enum CraftError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// The source image could not be read or decoded
    Decode {
        source_name: String,
        reason: String,
        context: ErrorContext,
    },
    /// The pixel kernel or scaler failed
    Processing {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// An operation that needs decoded pixels was issued during initialization
    NotReady {
        operation: String,
        context: ErrorContext,
    },
    /// Initialization failed earlier; carries the original failure
    InitFailed {
        source: Arc<CraftError>,
        context: ErrorContext,
    },
    /// State errors (invalid state transitions)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Resource allocation failures
    Resource {
        resource: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
}

impl CraftError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a decode error. Decode failures leave the engine unusable.
    pub fn decode(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a processing error
    pub fn processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a not-ready rejection
    pub fn not_ready(operation: impl Into<String>) -> Self {
        Self::NotReady {
            operation: operation.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .with_recovery_suggestion("await Engine::ready() before displaying or exporting")
                .recoverable(),
        }
    }

    /// Wrap a shared initialization failure
    pub fn init_failed(source: Arc<CraftError>) -> Self {
        Self::InitFailed {
            source,
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a resource error
    pub fn resource(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resource {
            resource: resource.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.into()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.context_mut().recoverable = true;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::NotReady { context, .. } => context,
            Self::InitFailed { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Resource { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Validation { context, .. } => context,
        }
    }

    /// Get mutable reference to error context
    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Decode { context, .. } => context,
            Self::Processing { context, .. } => context,
            Self::NotReady { context, .. } => context,
            Self::InitFailed { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Resource { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Validation { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Decode { .. } => "decode",
            Self::Processing { .. } => "processing",
            Self::NotReady { .. } => "not_ready",
            Self::InitFailed { .. } => "init_failed",
            Self::State { .. } => "state",
            Self::Resource { .. } => "resource",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
            Self::Validation { .. } => "validation",
        }
    }
}

impl fmt::Display for CraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CraftError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            CraftError::Decode {
                source_name,
                reason,
                ..
            } => {
                write!(f, "Failed to decode '{}': {}", source_name, reason)
            }
            CraftError::Processing {
                operation, reason, ..
            } => {
                write!(f, "Processing failed during {}: {}", operation, reason)
            }
            CraftError::NotReady { operation, .. } => {
                write!(
                    f,
                    "Engine is still initializing; '{}' is not available yet",
                    operation
                )
            }
            CraftError::InitFailed { source, .. } => {
                write!(f, "Engine initialization failed: {}", source)
            }
            CraftError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state transition from '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            CraftError::Resource {
                resource, reason, ..
            } => {
                write!(f, "Resource allocation failed for {}: {}", resource, reason)
            }
            CraftError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            CraftError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
            CraftError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
        }
    }
}

impl StdError for CraftError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            Self::InitFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type CraftResult<T> = Result<T, CraftError>;

/// Trait for errors that can be recovered from
pub trait Recoverable {
    /// Check if this error can be recovered from
    fn is_recoverable(&self) -> bool;

    /// Get recovery strategies for this error
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

/// Recovery strategies for handling errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Wait for a lifecycle transition, then issue the operation again
    AwaitReady,
    /// Skip the current operation
    Skip { reason: String },
    /// Keep showing the last good output
    KeepPrevious { description: String },
}

impl Recoverable for CraftError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable
            || matches!(self, Self::Processing { .. } | Self::NotReady { .. })
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::NotReady { .. } => vec![RecoveryStrategy::AwaitReady],
            Self::Processing { .. } => vec![
                RecoveryStrategy::Skip {
                    reason: "Drop the current frame".to_string(),
                },
                RecoveryStrategy::KeepPrevious {
                    description: "Previously published preview stays visible".to_string(),
                },
            ],
            _ => vec![],
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for CraftError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for CraftError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error is transient (may resolve itself)
    pub fn is_transient(error: &CraftError) -> bool {
        matches!(
            error,
            CraftError::NotReady { .. } | CraftError::Processing { .. }
        )
    }

    /// Check if an error is fatal (cannot be recovered from)
    pub fn is_fatal(error: &CraftError) -> bool {
        matches!(
            error,
            CraftError::Config { .. }
                | CraftError::Decode { .. }
                | CraftError::InitFailed { .. }
                | CraftError::Validation { .. }
        ) || error.severity() == ErrorSeverity::Fatal
    }
}

/// Error conversion implementations
impl From<std::io::Error> for CraftError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for CraftError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for CraftError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

impl From<craft_scale::cpu::ScaleError> for CraftError {
    fn from(error: craft_scale::cpu::ScaleError) -> Self {
        Self::external("craft-scale", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = CraftError::config("debounce_ms", "0", "must be greater than 0");
        assert_eq!(error.category(), "config");
        assert!(!error.is_recoverable());
        assert!(classify::is_fatal(&error));
    }

    #[test]
    fn test_error_with_context() {
        let error = CraftError::processing("render", "kernel failed")
            .with_context("preview 1080x810")
            .with_recovery_suggestion("previous preview remains visible")
            .with_metadata("sequence", "4");

        assert_eq!(error.category(), "processing");
        assert!(error.is_recoverable());
        assert_eq!(
            error.recovery_suggestion(),
            Some("previous preview remains visible")
        );
        assert_eq!(
            error.context().metadata.get("sequence").map(String::as_str),
            Some("4")
        );
    }

    #[test]
    fn test_not_ready_is_transient_warning() {
        let error = CraftError::not_ready("show_after");
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert!(classify::is_transient(&error));
        assert_eq!(error.recovery_strategies(), vec![RecoveryStrategy::AwaitReady]);
        assert!(error.to_string().contains("show_after"));
    }

    #[test]
    fn test_init_failure_chains_source() {
        let decode = Arc::new(CraftError::decode("photo.jpg", "truncated file"));
        assert_eq!(decode.severity(), ErrorSeverity::Fatal);

        let wrapped = CraftError::init_failed(decode);
        assert!(classify::is_fatal(&wrapped));
        let source = wrapped.source().expect("init failure keeps its cause");
        assert!(source.to_string().contains("photo.jpg"));
    }

    #[test]
    fn test_io_source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = CraftError::io_at("open", "/tmp/none.jpg", io);
        assert_eq!(error.category(), "io");
        assert!(error.source().is_some());
        assert!(error.to_string().contains("/tmp/none.jpg"));
    }
}
