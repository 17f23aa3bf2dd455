use std::collections::HashMap;

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::scene::{Capability, Rgba, SceneNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationKind {
    Color,
    LightIntensity,
    Scale,
    Rotation,
    Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariationPoint {
    pub name: String,
    pub kind: VariationKind,
    pub target_path: String,
    pub parameters: HashMap<String, serde_json::Value>,
}

impl VariationPoint {
    pub fn new(
        name: impl Into<String>,
        kind: VariationKind,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target_path: target_path.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Per-kind value union, checked against the point's kind at the apply
/// boundary rather than at use-site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariationValue {
    Color(Rgba),
    LightIntensity(f32),
    Scale(Vec3),
    Rotation(Quat),
    Position(Vec3),
}

impl VariationValue {
    pub fn kind(&self) -> VariationKind {
        match self {
            VariationValue::Color(_) => VariationKind::Color,
            VariationValue::LightIntensity(_) => VariationKind::LightIntensity,
            VariationValue::Scale(_) => VariationKind::Scale,
            VariationValue::Rotation(_) => VariationKind::Rotation,
            VariationValue::Position(_) => VariationKind::Position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariationError {
    #[error("variation target not found under instance root: {target_path}")]
    TargetMissing { target_path: String },
    #[error("variation point {name} expects {expected:?}, got {supplied:?}")]
    KindMismatch {
        name: String,
        expected: VariationKind,
        supplied: VariationKind,
    },
    #[error("variation target {target_path} lacks required capability {capability}")]
    CapabilityMissing {
        target_path: String,
        capability: &'static str,
    },
}

pub(crate) fn apply_point(
    root: &mut SceneNode,
    point: &VariationPoint,
    value: &VariationValue,
) -> Result<(), VariationError> {
    if value.kind() != point.kind {
        return Err(VariationError::KindMismatch {
            name: point.name.clone(),
            expected: point.kind,
            supplied: value.kind(),
        });
    }

    let target =
        root.descendant_mut(&point.target_path)
            .ok_or_else(|| VariationError::TargetMissing {
                target_path: point.target_path.clone(),
            })?;

    match value {
        VariationValue::Color(color) => match target.capability_mut("mesh") {
            Some(Capability::Mesh { material }) => {
                material.color = *color;
                Ok(())
            }
            _ => Err(VariationError::CapabilityMissing {
                target_path: point.target_path.clone(),
                capability: "mesh",
            }),
        },
        VariationValue::LightIntensity(intensity) => match target.capability_mut("light") {
            Some(Capability::Light {
                intensity: current, ..
            }) => {
                *current = *intensity;
                Ok(())
            }
            _ => Err(VariationError::CapabilityMissing {
                target_path: point.target_path.clone(),
                capability: "light",
            }),
        },
        VariationValue::Scale(scale) => {
            target.transform.scale = *scale;
            Ok(())
        }
        VariationValue::Rotation(rotation) => {
            target.transform.rotation = *rotation;
            Ok(())
        }
        VariationValue::Position(position) => {
            target.transform.position = *position;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;

    fn lantern() -> SceneNode {
        SceneNode::new("lantern")
            .with_capability(Capability::Mesh {
                material: Material::default(),
            })
            .with_child(SceneNode::new("wick").with_capability(Capability::Light {
                color: Rgba::WHITE,
                intensity: 1.0,
            }))
    }

    #[test]
    fn color_applies_to_mesh_material() {
        let mut root = lantern();
        let point = VariationPoint::new("color", VariationKind::Color, "");
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);

        apply_point(&mut root, &point, &VariationValue::Color(red)).expect("apply");

        match root.capability("mesh") {
            Some(Capability::Mesh { material }) => assert_eq!(material.color, red),
            other => panic!("unexpected capability: {other:?}"),
        }
    }

    #[test]
    fn light_intensity_applies_to_nested_target() {
        let mut root = lantern();
        let point = VariationPoint::new("wick/intensity", VariationKind::LightIntensity, "wick");

        apply_point(&mut root, &point, &VariationValue::LightIntensity(0.25)).expect("apply");

        match root.descendant("wick").expect("wick").capability("light") {
            Some(Capability::Light { intensity, .. }) => assert_eq!(*intensity, 0.25),
            other => panic!("unexpected capability: {other:?}"),
        }
    }

    #[test]
    fn transform_kinds_write_the_target_transform() {
        let mut root = lantern();

        let scale = VariationPoint::new("scale", VariationKind::Scale, "");
        apply_point(&mut root, &scale, &VariationValue::Scale(Vec3::splat(2.0))).expect("scale");

        let rotation = VariationPoint::new("rotation", VariationKind::Rotation, "");
        let quarter_turn = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        apply_point(&mut root, &rotation, &VariationValue::Rotation(quarter_turn))
            .expect("rotation");

        let position = VariationPoint::new("position", VariationKind::Position, "wick");
        apply_point(
            &mut root,
            &position,
            &VariationValue::Position(Vec3::new(0.0, 1.5, 0.0)),
        )
        .expect("position");

        assert_eq!(root.transform.scale, Vec3::splat(2.0));
        assert_eq!(root.transform.rotation, quarter_turn);
        assert_eq!(
            root.descendant("wick").expect("wick").transform.position,
            Vec3::new(0.0, 1.5, 0.0)
        );
    }

    #[test]
    fn kind_mismatch_is_rejected_at_the_boundary() {
        let mut root = lantern();
        let point = VariationPoint::new("color", VariationKind::Color, "");

        let error = apply_point(&mut root, &point, &VariationValue::LightIntensity(0.5))
            .expect_err("mismatch");
        assert!(matches!(error, VariationError::KindMismatch { .. }));
    }

    #[test]
    fn missing_target_is_rejected_per_point() {
        let mut root = lantern();
        let point = VariationPoint::new("shade/color", VariationKind::Color, "shade");

        let error = apply_point(
            &mut root,
            &point,
            &VariationValue::Color(Rgba::WHITE),
        )
        .expect_err("missing target");
        assert!(matches!(error, VariationError::TargetMissing { .. }));
    }

    #[test]
    fn capability_missing_is_rejected_per_point() {
        let mut root = lantern();
        let point = VariationPoint::new("wick/color", VariationKind::Color, "wick");

        let error = apply_point(&mut root, &point, &VariationValue::Color(Rgba::WHITE))
            .expect_err("no mesh on wick");
        assert!(matches!(error, VariationError::CapabilityMissing { .. }));
    }
}
