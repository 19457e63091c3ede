//! Per-annotation metadata record.
//!
//! Mirrors what the annotation server keeps next to each mask: a display name, the class
//! label, the painted region and the shape of the image it was drawn on. The compositor
//! itself only ever needs [`AnnotationMeta::bbox`].

use crate::{
    foundation::core::{BoundingBox, Shape},
    foundation::error::{StackError, StackResult},
    stack::layer::LayerRef,
};

/// Metadata of one annotation layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationMeta {
    /// Annotation name.
    pub name: String,
    /// Class label.
    pub class_name: String,
    /// Painted region.
    pub bbox: BoundingBox,
    /// Shape of the source image.
    pub source_shape: Shape,
}

impl AnnotationMeta {
    /// Record for a stacked layer.
    pub fn for_layer(
        name: impl Into<String>,
        class_name: impl Into<String>,
        layer: &LayerRef<'_>,
        source_shape: Shape,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            bbox: layer.bbox,
            source_shape,
        }
    }

    /// Parse and validate a JSON record.
    pub fn from_json(s: &str) -> StackResult<Self> {
        let meta: Self =
            serde_json::from_str(s).map_err(|e| StackError::serde(format!("annotation meta: {e}")))?;
        meta.source_shape.validate()?;
        meta.bbox.check_within(meta.source_shape)?;
        Ok(meta)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> StackResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StackError::serde(format!("annotation meta: {e}")))
    }
}

#[cfg(test)]
#[path = "../tests/unit/meta.rs"]
mod tests;
