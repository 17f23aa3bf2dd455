use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Rgba,
}

impl Default for Material {
    fn default() -> Self {
        Self { color: Rgba::WHITE }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Mesh { material: Material },
    Light { color: Rgba, intensity: f32 },
    Tag(String),
}

impl Capability {
    pub fn type_name(&self) -> &'static str {
        match self {
            Capability::Mesh { .. } => "mesh",
            Capability::Light { .. } => "light",
            Capability::Tag(_) => "tag",
        }
    }
}

/// Node path convention:
/// - A path is slash-joined child names walked from (but excluding) the
///   node the lookup starts at; the empty path addresses that node itself.
/// - Flattened hierarchy paths include the root under its own name, so a
///   lamp with one arm flattens to `["lamp", "lamp/arm"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub capabilities: Vec<Capability>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            capabilities: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn capability(&self, type_name: &str) -> Option<&Capability> {
        self.capabilities
            .iter()
            .find(|capability| capability.type_name() == type_name)
    }

    pub fn capability_mut(&mut self, type_name: &str) -> Option<&mut Capability> {
        self.capabilities
            .iter_mut()
            .find(|capability| capability.type_name() == type_name)
    }

    pub fn has_capability(&self, type_name: &str) -> bool {
        self.capability(type_name).is_some()
    }

    pub fn descendant(&self, path: &str) -> Option<&SceneNode> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('/') {
            current = current
                .children
                .iter()
                .find(|child| child.name == segment)?;
        }
        Some(current)
    }

    pub fn descendant_mut(&mut self, path: &str) -> Option<&mut SceneNode> {
        if path.is_empty() {
            return Some(self);
        }
        let mut current = self;
        for segment in path.split('/') {
            current = current
                .children
                .iter_mut()
                .find(|child| child.name == segment)?;
        }
        Some(current)
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SceneNode::node_count)
            .sum::<usize>()
    }

    /// Depth-first (node-relative path, node) pairs, root first under the
    /// empty path.
    pub fn walk(&self) -> Vec<(String, &SceneNode)> {
        let mut nodes = Vec::new();
        self.walk_into(String::new(), &mut nodes);
        nodes
    }

    fn walk_into<'a>(&'a self, path: String, out: &mut Vec<(String, &'a SceneNode)>) {
        out.push((path.clone(), self));
        for child in &self.children {
            let child_path = if path.is_empty() {
                child.name.clone()
            } else {
                format!("{path}/{}", child.name)
            };
            child.walk_into(child_path, out);
        }
    }

    pub fn flatten_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths(&self.name, &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        out.push(prefix.to_string());
        for child in &self.children {
            child.collect_paths(&format!("{prefix}/{}", child.name), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp_node() -> SceneNode {
        SceneNode::new("lamp")
            .with_capability(Capability::Mesh {
                material: Material::default(),
            })
            .with_child(
                SceneNode::new("arm").with_child(SceneNode::new("bulb").with_capability(
                    Capability::Light {
                        color: Rgba::WHITE,
                        intensity: 1.0,
                    },
                )),
            )
    }

    #[test]
    fn empty_path_resolves_to_self() {
        let lamp = lamp_node();
        let resolved = lamp.descendant("").expect("root");
        assert_eq!(resolved.name, "lamp");
    }

    #[test]
    fn nested_path_resolves_depth_first() {
        let lamp = lamp_node();
        let bulb = lamp.descendant("arm/bulb").expect("bulb");
        assert!(bulb.has_capability("light"));
    }

    #[test]
    fn unknown_path_resolves_to_none() {
        let lamp = lamp_node();
        assert!(lamp.descendant("arm/shade").is_none());
        assert!(lamp.descendant("base").is_none());
    }

    #[test]
    fn flatten_paths_is_depth_first_and_rooted() {
        let lamp = lamp_node();
        assert_eq!(
            lamp.flatten_paths(),
            vec![
                "lamp".to_string(),
                "lamp/arm".to_string(),
                "lamp/arm/bulb".to_string()
            ]
        );
    }

    #[test]
    fn walk_yields_node_relative_paths() {
        let lamp = lamp_node();
        let paths: Vec<String> = lamp.walk().into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["", "arm", "arm/bulb"]);
    }

    #[test]
    fn capability_lookup_by_type_name() {
        let mut lamp = lamp_node();
        assert!(lamp.capability("mesh").is_some());
        assert!(lamp.capability("light").is_none());
        match lamp.capability_mut("mesh") {
            Some(Capability::Mesh { material }) => {
                material.color = Rgba::new(1.0, 0.0, 0.0, 1.0);
            }
            other => panic!("unexpected capability: {other:?}"),
        }
    }

    #[test]
    fn node_count_includes_all_descendants() {
        assert_eq!(lamp_node().node_count(), 3);
    }
}
