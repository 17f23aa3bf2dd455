use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::scene::SceneNode;

use super::variation::{VariationKind, VariationPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub u64);

/// Cheap handle to a loaded prototype tree. Loading the same path twice
/// yields handles that share the same id and the same underlying tree.
#[derive(Debug, Clone)]
pub struct Template {
    id: TemplateId,
    root: Arc<SceneNode>,
}

impl Template {
    pub(crate) fn new(id: TemplateId, root: Arc<SceneNode>) -> Self {
        Self { id, root }
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    pub fn same_handle(&self, other: &Template) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.root, &other.root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("child count changed: expected {expected}, got {actual}")]
    ChildCountChanged { expected: usize, actual: usize },
    #[error("capability type no longer present: {type_name}")]
    CapabilityMissing { type_name: String },
    #[error("hierarchy node count changed: expected {expected}, got {actual}")]
    HierarchyCountChanged { expected: usize, actual: usize },
}

/// Structural fingerprint captured once at load time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegritySnapshot {
    child_count: usize,
    capability_types: BTreeSet<String>,
    hierarchy_paths: Vec<String>,
}

impl IntegritySnapshot {
    pub fn capture(root: &SceneNode) -> Self {
        Self {
            child_count: root.children.len(),
            capability_types: capability_inventory(root),
            hierarchy_paths: root.flatten_paths(),
        }
    }

    pub fn child_count(&self) -> usize {
        self.child_count
    }

    pub fn capability_types(&self) -> &BTreeSet<String> {
        &self.capability_types
    }

    pub fn hierarchy_paths(&self) -> &[String] {
        &self.hierarchy_paths
    }

    /// Detection only: reports every axis that drifted, repairs nothing.
    pub fn check(&self, root: &SceneNode) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        let actual_children = root.children.len();
        if actual_children != self.child_count {
            violations.push(IntegrityViolation::ChildCountChanged {
                expected: self.child_count,
                actual: actual_children,
            });
        }

        let present = capability_inventory(root);
        for type_name in &self.capability_types {
            if !present.contains(type_name) {
                violations.push(IntegrityViolation::CapabilityMissing {
                    type_name: type_name.clone(),
                });
            }
        }

        let actual_paths = root.flatten_paths();
        if actual_paths.len() != self.hierarchy_paths.len() {
            violations.push(IntegrityViolation::HierarchyCountChanged {
                expected: self.hierarchy_paths.len(),
                actual: actual_paths.len(),
            });
        }

        violations
    }
}

fn capability_inventory(root: &SceneNode) -> BTreeSet<String> {
    root.walk()
        .into_iter()
        .flat_map(|(_, node)| {
            node.capabilities
                .iter()
                .map(|capability| capability.type_name().to_string())
        })
        .collect()
}

#[derive(Debug)]
pub struct AssetRecord {
    path: String,
    template: Template,
    variation_points: Vec<VariationPoint>,
    integrity: IntegritySnapshot,
    properties: HashMap<String, serde_json::Value>,
}

impl AssetRecord {
    pub(crate) fn new(path: impl Into<String>, template: Template) -> Self {
        let integrity = IntegritySnapshot::capture(template.root());
        let variation_points = detect_variation_points(template.root());
        Self {
            path: path.into(),
            template,
            variation_points,
            integrity,
            properties: HashMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn integrity(&self) -> &IntegritySnapshot {
        &self.integrity
    }

    pub fn variation_points(&self) -> &[VariationPoint] {
        &self.variation_points
    }

    pub fn variation_point(&self, name: &str) -> Option<&VariationPoint> {
        self.variation_points.iter().find(|point| point.name == name)
    }

    /// Manually declared points join the auto-detected set; a name collision
    /// keeps the existing point.
    pub fn add_variation_point(&mut self, point: VariationPoint) -> bool {
        if self.variation_point(&point.name).is_some() {
            warn!(
                path = %self.path,
                name = %point.name,
                "variation_point_name_taken"
            );
            return false;
        }
        self.variation_points.push(point);
        true
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.properties.insert(key.into(), value);
    }
}

/// One Color point per mesh-bearing node, one LightIntensity point per
/// light-bearing node, named after the node's relative path. Deterministic
/// for a given tree; first occurrence wins on duplicate names.
fn detect_variation_points(root: &SceneNode) -> Vec<VariationPoint> {
    let mut points: Vec<VariationPoint> = Vec::new();
    for (path, node) in root.walk() {
        if node.has_capability("mesh") {
            push_unique(
                &mut points,
                VariationPoint::new(
                    point_name(&path, "color"),
                    VariationKind::Color,
                    path.as_str(),
                ),
            );
        }
        if node.has_capability("light") {
            push_unique(
                &mut points,
                VariationPoint::new(
                    point_name(&path, "intensity"),
                    VariationKind::LightIntensity,
                    path.as_str(),
                ),
            );
        }
    }
    points
}

fn point_name(path: &str, suffix: &str) -> String {
    if path.is_empty() {
        suffix.to_string()
    } else {
        format!("{path}/{suffix}")
    }
}

fn push_unique(points: &mut Vec<VariationPoint>, point: VariationPoint) {
    if points.iter().any(|existing| existing.name == point.name) {
        debug!(name = %point.name, "duplicate_variation_point_skipped");
        return;
    }
    points.push(point);
}
