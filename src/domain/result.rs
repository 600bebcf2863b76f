//! Result type alias for MedBundle

use super::errors::MedBundleError;

/// Result type alias for MedBundle operations
///
/// # Examples
///
/// ```
/// use medbundle::domain::result::Result;
/// use medbundle::domain::errors::MedBundleError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(MedBundleError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, MedBundleError>;
