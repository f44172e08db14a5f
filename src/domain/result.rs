//! Result type alias for Pulse

use super::errors::PulseError;

/// Result type alias for Pulse operations
///
/// # Examples
///
/// ```
/// use pulse::domain::result::Result;
/// use pulse::domain::errors::PulseError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PulseError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PulseError>;
