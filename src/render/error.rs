//! Page renderer error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Template failed to load or compile
    #[error("Template error: {0}")]
    Template(String),

    /// Template failed while rendering
    #[error("Render error: {0}")]
    Render(String),
}
