use derive_more::Display;

pub type Result<T> = core::result::Result<T, MarchingCubesError>;

/// Setup-time failures. Nothing on the per-sample path produces one of these.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("{self:?}")]
pub enum MarchingCubesError {
    /// The DDA step budget was zero.
    InvalidStepBudget,
    /// The pixel stride was zero or coarser than the viewport.
    InvalidResolution,
    /// The sample grid has no width or no height.
    EmptyViewport,
    /// The brush radius was negative.
    InvalidBrushRadius,
    /// A configured density or strength was NaN or infinite.
    NonFiniteValue,
    /// A chunk's value grid doesn't have one entry per corner.
    InvalidChunkShape,
}

impl std::error::Error for MarchingCubesError {}
