mod node;
mod world;

pub use node::{Capability, Material, Rgba, SceneNode, Transform};
pub use world::{InstanceId, ReleaseHook, Scene, SceneObject, ScopeId};
