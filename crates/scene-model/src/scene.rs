//! Scene documents: named, animated layer lists.
//!
//! A scene document is a JSON file holding one or more scenes. Each scene
//! carries optional export defaults and an ordered list of rectangular
//! layers whose properties may be animated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::Animated;
use crate::error::ModelError;
use crate::export::ClearColor;
use crate::framerate::Framerate;

/// A file containing named scenes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub scenes: Vec<SceneDescription>,
}

/// One scene that can be exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub name: String,

    /// Preferred frame rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framerate: Option<Framerate>,

    /// Preferred length in seconds. Defaults to the last keyframe time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Preferred multisample count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_color: Option<ClearColor>,

    /// Layers in paint order (first is painted first).
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// An axis-aligned rectangle in normalized viewport coordinates.
///
/// `(0, 0)` is the top-left corner of the output, `(1, 1)` the bottom-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub name: String,

    pub x: Animated<f64>,
    pub y: Animated<f64>,
    pub width: Animated<f64>,
    pub height: Animated<f64>,

    /// Linear RGBA in `[0, 1]`.
    pub color: Animated<[f64; 4]>,

    /// Depth in `[0, 1]`; nearer is smaller. Fragments pass when their
    /// depth is less than or equal to what is already stored.
    #[serde(default)]
    pub depth: Animated<f64>,
}

/// A layer evaluated at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: [f64; 4],
    pub depth: f64,
}

impl SceneDocument {
    /// Load a scene document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document: SceneDocument =
            serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        document.validate()?;
        Ok(document)
    }

    /// Parse and validate a scene document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let document: SceneDocument = serde_json::from_str(json)
            .map_err(|e| ModelError::invalid_scene(format!("malformed scene document: {e}")))?;
        document.validate()?;
        Ok(document)
    }

    /// Validate every scene in the document.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (i, scene) in self.scenes.iter().enumerate() {
            if self.scenes[..i].iter().any(|other| other.name == scene.name) {
                return Err(ModelError::invalid_scene(format!(
                    "duplicate scene name `{}`",
                    scene.name
                )));
            }
            scene.validate()?;
        }
        Ok(())
    }

    /// Pick the scene to export.
    ///
    /// - `Ok(None)`: nothing to export (no name given and the document is empty).
    /// - `Ok(Some(scene))`: the named scene, or the first one when no name is given.
    /// - `Err(..)`: a name was given but no scene has it.
    pub fn select(&self, name: Option<&str>) -> Result<Option<&SceneDescription>, ModelError> {
        match name {
            None => Ok(self.scenes.first()),
            Some(name) => self
                .scenes
                .iter()
                .find(|scene| scene.name == name)
                .map(Some)
                .ok_or_else(|| ModelError::UnknownScene {
                    name: name.to_string(),
                    available: self
                        .scenes
                        .iter()
                        .map(|scene| scene.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                }),
        }
    }
}

impl SceneDescription {
    /// Validate export defaults and every layer's animations.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(duration) = self.duration_secs {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ModelError::invalid_scene(format!(
                    "scene `{}` has invalid duration {duration}",
                    self.name
                )));
            }
        }
        for (index, layer) in self.layers.iter().enumerate() {
            layer.validate().map_err(|message| {
                ModelError::invalid_scene(format!(
                    "scene `{}` layer {index} ({}): {message}",
                    self.name, layer.name
                ))
            })?;
        }
        Ok(())
    }

    /// Time of the last keyframe across all layers.
    pub fn natural_duration(&self) -> f64 {
        self.layers
            .iter()
            .map(Layer::end_time)
            .fold(0.0, f64::max)
    }
}

impl Layer {
    /// Evaluate every property at `time`.
    ///
    /// Validated layers always evaluate; `None` means an empty keyframe list.
    pub fn evaluate(&self, time: f64) -> Option<LayerState> {
        Some(LayerState {
            x: self.x.evaluate(time)?,
            y: self.y.evaluate(time)?,
            width: self.width.evaluate(time)?,
            height: self.height.evaluate(time)?,
            color: self.color.evaluate(time)?,
            depth: self.depth.evaluate(time)?,
        })
    }

    fn end_time(&self) -> f64 {
        [
            self.x.end_time(),
            self.y.end_time(),
            self.width.end_time(),
            self.height.end_time(),
            self.color.end_time(),
            self.depth.end_time(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    fn validate(&self) -> Result<(), String> {
        self.x.check().map_err(|e| format!("x: {e}"))?;
        self.y.check().map_err(|e| format!("y: {e}"))?;
        self.width.check().map_err(|e| format!("width: {e}"))?;
        self.height.check().map_err(|e| format!("height: {e}"))?;
        self.color.check().map_err(|e| format!("color: {e}"))?;
        self.depth.check().map_err(|e| format!("depth: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "scenes": [
            {
                "name": "intro",
                "framerate": "30/1",
                "duration_secs": 2.0,
                "clear_color": [0.1, 0.1, 0.1, 1.0],
                "layers": [
                    {
                        "name": "box",
                        "x": [{"time": 0, "value": 0.0}, {"time": 2, "value": 0.5}],
                        "y": 0.25,
                        "width": 0.5,
                        "height": 0.5,
                        "color": [1, 0, 0, 1]
                    }
                ]
            },
            { "name": "empty" }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = SceneDocument::from_json(DOC).unwrap();
        assert_eq!(doc.scenes.len(), 2);
        let intro = &doc.scenes[0];
        assert_eq!(intro.framerate, Some(Framerate::fps(30)));
        assert_eq!(intro.layers[0].depth, Animated::Constant(0.0));
        assert_eq!(intro.natural_duration(), 2.0);
    }

    #[test]
    fn test_layer_evaluation() {
        let doc = SceneDocument::from_json(DOC).unwrap();
        let state = doc.scenes[0].layers[0].evaluate(1.0).unwrap();
        assert_eq!(state.x, 0.25);
        assert_eq!(state.y, 0.25);
        assert_eq!(state.color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_select() {
        let doc = SceneDocument::from_json(DOC).unwrap();
        assert_eq!(doc.select(None).unwrap().unwrap().name, "intro");
        assert_eq!(doc.select(Some("empty")).unwrap().unwrap().name, "empty");
        let err = doc.select(Some("missing")).unwrap_err();
        assert!(err.to_string().contains("intro, empty"));
    }

    #[test]
    fn test_select_on_empty_document_is_nothing_to_export() {
        let doc = SceneDocument::from_json("{}").unwrap();
        assert!(doc.select(None).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = SceneDocument::from_json(r#"{"scenes": [{"name": "a"}, {"name": "a"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_invalid_keyframes_rejected() {
        let json = r#"{"scenes": [{"name": "bad", "layers": [{
            "x": [], "y": 0, "width": 1, "height": 1, "color": [1, 1, 1, 1]
        }]}]}"#;
        let err = SceneDocument::from_json(json).unwrap_err();
        assert!(err.to_string().contains("x: keyframe list is empty"));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("framepipe_test_missing_scene.json");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            SceneDocument::load(&path),
            Err(ModelError::IoError { .. })
        ));
    }
}
