//! Error types for the drawing library and render backends.

use thiserror::Error;

use crate::backend::{ProgramId, TargetId};

/// Errors raised by immediate-mode drawing calls on a [`crate::Painter`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawError {
    /// `pop` without a matching `push`.
    #[error("pop without matching push")]
    UnbalancedPop,

    /// `vertex` or `end_shape` outside `begin_shape` .. `end_shape`.
    #[error("{0} called outside begin_shape/end_shape")]
    ShapeNotBegun(&'static str),

    /// `begin_shape` while another shape is still open.
    #[error("begin_shape called while a shape is already open")]
    ShapeAlreadyBegun,

    /// A vertex with a NaN or infinite coordinate.
    #[error("non-finite vertex ({0}, {1}, {2})")]
    NonFiniteVertex(f32, f32, f32),
}

/// Errors raised by a [`crate::RenderBackend`].
#[derive(Error, Debug)]
pub enum BackendError {
    /// Offscreen target allocation failed.
    #[error("failed to allocate offscreen target: {0}")]
    TargetAllocation(String),

    /// Shader program failed to compile or link.
    #[error("failed to compile shader program `{label}`: {message}")]
    ShaderCompilation { label: String, message: String },

    #[error("unknown offscreen target {0:?}")]
    UnknownTarget(TargetId),

    #[error("unknown shader program {0:?}")]
    UnknownProgram(ProgramId),

    #[error("shader program has no uniform named `{0}`")]
    UnknownUniform(String),

    #[error("uniform `{name}` expects {expected}")]
    UniformType { name: String, expected: &'static str },

    /// Operation issued while the wrong destination (or none) is bound.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The host has not provided a screen view for this frame.
    #[error("no screen view available for this frame")]
    NoScreen,

    /// GPU/wgpu error.
    #[error("GPU error: {0}")]
    Gpu(String),
}
