//! Error types for the underlay renderer.

use engine_core::BackendError;
use thiserror::Error;

use crate::compositor::PipelineState;

#[derive(Error, Debug)]
pub enum UnderlayError {
    /// Offscreen target or composite program could not be created. Nothing will render.
    #[error("failed to initialize the underlay pipeline: {0}")]
    Init(#[source] BackendError),

    /// A frame operation was issued out of order.
    #[error("cannot {op} while the pipeline is {from:?}")]
    InvalidTransition {
        from: PipelineState,
        op: &'static str,
    },

    /// The backend rejected a call mid-frame.
    #[error("render backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, UnderlayError>;
