//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to the single line printed on failure.
pub fn map_error(e: &ApiError) -> String {
    format!("Error: {}", e)
}
