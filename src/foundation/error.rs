/// Convenience result type used across annostack.
pub type StackResult<T> = Result<T, StackError>;

/// Error taxonomy of the layer stack, compositor and overlay helpers.
#[derive(thiserror::Error, Debug)]
pub enum StackError {
    /// A select or visibility operation referenced a layer outside `[0, count)`.
    #[error("invalid layer index: {index} (layer count {count})")]
    InvalidLayerIndex {
        /// Index requested by the caller.
        index: usize,
        /// Number of layers in the stack at the time of the call.
        count: usize,
    },

    /// A buffer's dimensions disagree with the shape established by the stack.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A bounding box with inverted extents (`row1 < row0` or `col1 < col0`).
    #[error("degenerate bounding box: {0}")]
    DegenerateBoundingBox(String),

    /// A bounding box reaching outside the buffer extents.
    #[error("bounding box out of bounds: {0}")]
    BoxOutOfBounds(String),

    /// Invalid configuration or argument values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Layer storage could not grow: the size overflows `usize` or the allocator refused it.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Errors when serializing or deserializing metadata records.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    /// Build a [`StackError::InvalidLayerIndex`] value.
    pub fn invalid_index(index: usize, count: usize) -> Self {
        Self::InvalidLayerIndex { index, count }
    }

    /// Build a [`StackError::ShapeMismatch`] value.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Build a [`StackError::DegenerateBoundingBox`] value.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateBoundingBox(msg.into())
    }

    /// Build a [`StackError::BoxOutOfBounds`] value.
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::BoxOutOfBounds(msg.into())
    }

    /// Build a [`StackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StackError::CapacityExceeded`] value.
    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::CapacityExceeded(msg.into())
    }

    /// Build a [`StackError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
