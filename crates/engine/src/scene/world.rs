use std::collections::HashMap;

use super::node::SceneNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u64);

/// Instance-local hook run when a pooled instance is parked again.
pub type ReleaseHook = fn(&mut SceneNode);

#[derive(Debug)]
pub struct SceneObject {
    root: SceneNode,
    active: bool,
    parent: Option<ScopeId>,
    release_hook: Option<ReleaseHook>,
}

impl SceneObject {
    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.root
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn release_hook(&self) -> Option<ReleaseHook> {
        self.release_hook
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    objects: HashMap<InstanceId, SceneObject>,
    scopes: HashMap<ScopeId, String>,
    next_instance: u64,
    next_scope: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, root: SceneNode) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance = self.next_instance.saturating_add(1);
        self.objects.insert(
            id,
            SceneObject {
                root,
                active: true,
                parent: None,
                release_hook: None,
            },
        );
        id
    }

    pub fn despawn(&mut self, id: InstanceId) -> bool {
        self.objects.remove(&id).is_some()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: InstanceId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: InstanceId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn create_scope(&mut self, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.next_scope);
        self.next_scope = self.next_scope.saturating_add(1);
        self.scopes.insert(id, name.into());
        id
    }

    pub fn scope_name(&self, id: ScopeId) -> Option<&str> {
        self.scopes.get(&id).map(String::as_str)
    }

    pub fn set_active(&mut self, id: InstanceId, active: bool) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.active = active;
                true
            }
            None => false,
        }
    }

    pub fn set_parent(&mut self, id: InstanceId, parent: Option<ScopeId>) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.parent = parent;
                true
            }
            None => false,
        }
    }

    pub fn set_release_hook(&mut self, id: InstanceId, hook: Option<ReleaseHook>) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.release_hook = hook;
                true
            }
            None => false,
        }
    }
}
