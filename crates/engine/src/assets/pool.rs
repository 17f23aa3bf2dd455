use std::collections::{HashSet, VecDeque};

use glam::{Quat, Vec3};
use tracing::{debug, info, warn};

use crate::scene::{InstanceId, Scene, SceneNode, ScopeId, Transform};

use super::record::Template;

/// Cleanup never trims `available` below this floor, regardless of how small
/// `max_size / 4` comes out.
pub const CLEANUP_FLOOR_MIN: usize = 5;

const NODE_FOOTPRINT_KB: f64 = 16.0;
const MESH_FOOTPRINT_KB: f64 = 256.0;
const LIGHT_FOOTPRINT_KB: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct PoolConfig {
    pub initial_size: usize,
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 5,
            max_size: 50,
        }
    }
}

#[derive(Debug)]
pub struct InstancePool {
    path: String,
    template: Template,
    holding_scope: ScopeId,
    available: VecDeque<InstanceId>,
    active: HashSet<InstanceId>,
    config: PoolConfig,
    footprint_mb: f64,
}

impl InstancePool {
    pub(crate) fn new(
        scene: &mut Scene,
        path: impl Into<String>,
        template: Template,
        config: PoolConfig,
    ) -> Self {
        let path = path.into();
        let holding_scope = scene.create_scope(format!("pool:{path}"));
        let footprint_mb = estimate_footprint_mb(template.root());
        Self {
            path,
            template,
            holding_scope,
            available: VecDeque::new(),
            active: HashSet::new(),
            config,
            footprint_mb,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn holding_scope(&self) -> ScopeId {
        self.holding_scope
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn total_count(&self) -> usize {
        self.active.len() + self.available.len()
    }

    pub fn is_active(&self, instance: InstanceId) -> bool {
        self.active.contains(&instance)
    }

    pub fn cleanup_floor(&self) -> usize {
        CLEANUP_FLOOR_MIN.max(self.config.max_size / 4)
    }

    /// Static per-template footprint heuristic times every instance this
    /// pool currently holds, active or parked.
    pub fn memory_usage_mb(&self) -> f64 {
        self.footprint_mb * self.total_count() as f64
    }

    /// Tops `available` up to `count` parked instances.
    pub fn prepopulate(&mut self, scene: &mut Scene, count: usize) {
        let mut spawned = 0usize;
        while self.available.len() < count {
            let instance = scene.spawn(self.template.root().clone());
            scene.set_active(instance, false);
            scene.set_parent(instance, Some(self.holding_scope));
            self.available.push_back(instance);
            spawned += 1;
        }
        if spawned > 0 {
            debug!(
                pool = %self.path,
                spawned,
                available = self.available.len(),
                "pool_prepopulated"
            );
        }
    }

    /// Recycles a parked instance when one exists, otherwise clones the
    /// template. `max_size` is deliberately not a ceiling here; it only
    /// parameterizes the cleanup floor.
    pub fn acquire(
        &mut self,
        scene: &mut Scene,
        position: Vec3,
        rotation: Quat,
        parent: Option<ScopeId>,
    ) -> InstanceId {
        let (instance, reused) = loop {
            match self.available.pop_front() {
                Some(candidate) if scene.contains(candidate) => break (candidate, true),
                Some(candidate) => {
                    warn!(
                        pool = %self.path,
                        instance = candidate.0,
                        "parked_instance_missing_from_scene"
                    );
                }
                None => break (scene.spawn(self.template.root().clone()), false),
            }
        };

        if let Some(object) = scene.object_mut(instance) {
            object.root_mut().transform.position = position;
            object.root_mut().transform.rotation = rotation;
        }
        scene.set_active(instance, true);
        scene.set_parent(instance, parent);
        self.active.insert(instance);

        debug!(pool = %self.path, instance = instance.0, reused, "instance_acquired");
        instance
    }

    /// Parks an active instance: deactivate, reattach to the holding scope,
    /// reset the local transform, run the instance release hook, requeue.
    pub fn release(&mut self, scene: &mut Scene, instance: InstanceId) -> bool {
        if !self.active.remove(&instance) {
            return false;
        }
        if !scene.contains(instance) {
            warn!(
                pool = %self.path,
                instance = instance.0,
                "active_instance_missing_from_scene"
            );
            return true;
        }

        scene.set_active(instance, false);
        scene.set_parent(instance, Some(self.holding_scope));
        if let Some(object) = scene.object_mut(instance) {
            object.root_mut().transform = Transform::IDENTITY;
            if let Some(hook) = object.release_hook() {
                hook(object.root_mut());
            }
        }
        self.available.push_back(instance);

        debug!(pool = %self.path, instance = instance.0, "instance_released");
        true
    }

    /// Destroys parked instances down to `target` (default
    /// `max(5, max_size / 4)`). Active instances are never touched.
    pub fn cleanup(&mut self, scene: &mut Scene, target: Option<usize>) -> usize {
        let target = target.unwrap_or_else(|| self.cleanup_floor());
        let mut removed = 0usize;
        while self.available.len() > target {
            match self.available.pop_front() {
                Some(instance) => {
                    scene.despawn(instance);
                    removed += 1;
                }
                None => break,
            }
        }
        if removed > 0 {
            debug!(
                pool = %self.path,
                removed,
                remaining = self.available.len(),
                target,
                "pool_cleanup"
            );
        }
        removed
    }

    /// Force-releases everything still active, then destroys all parked
    /// instances.
    pub fn destroy(&mut self, scene: &mut Scene) {
        let active: Vec<InstanceId> = self.active.iter().copied().collect();
        for instance in active {
            self.release(scene, instance);
        }
        let destroyed = self.available.len();
        while let Some(instance) = self.available.pop_front() {
            scene.despawn(instance);
        }
        info!(pool = %self.path, destroyed, "pool_destroyed");
    }
}

fn estimate_footprint_mb(root: &SceneNode) -> f64 {
    let mut kb = 0.0;
    for (_, node) in root.walk() {
        kb += NODE_FOOTPRINT_KB;
        for capability in &node.capabilities {
            kb += match capability.type_name() {
                "mesh" => MESH_FOOTPRINT_KB,
                "light" => LIGHT_FOOTPRINT_KB,
                _ => 0.0,
            };
        }
    }
    kb / 1024.0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assets::record::TemplateId;
    use crate::scene::{Capability, Material};

    fn crate_template() -> Template {
        let root = SceneNode::new("crate").with_capability(Capability::Mesh {
            material: Material::default(),
        });
        Template::new(TemplateId(7), Arc::new(root))
    }

    fn make_pool(scene: &mut Scene, initial_size: usize, max_size: usize) -> InstancePool {
        let mut pool = InstancePool::new(
            scene,
            "props/crate",
            crate_template(),
            PoolConfig {
                initial_size,
                max_size,
            },
        );
        pool.prepopulate(scene, initial_size);
        pool
    }

    #[test]
    fn ten_acquires_reuse_five_and_create_five() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 5, 50);

        for _ in 0..10 {
            pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        }

        assert_eq!(pool.active_count(), 10);
        assert_eq!(pool.available_count(), 0);
        assert_eq!(scene.object_count(), 10);
    }

    #[test]
    fn partition_is_conserved_across_acquire_release_sequences() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 3, 50);

        let a = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        let b = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert_eq!(pool.total_count(), 3);

        assert!(pool.release(&mut scene, a));
        let c = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert!(pool.release(&mut scene, b));
        assert!(pool.release(&mut scene, c));

        assert_eq!(pool.total_count(), 3);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.available_count(), 3);
        assert_eq!(scene.object_count(), 3);
    }

    #[test]
    fn release_of_non_active_instance_is_refused() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 1, 50);

        let foreign = scene.spawn(SceneNode::new("foreign"));
        assert!(!pool.release(&mut scene, foreign));

        let owned = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert!(pool.release(&mut scene, owned));
        assert!(!pool.release(&mut scene, owned));
    }

    #[test]
    fn release_parks_resets_and_runs_hook() {
        fn strip_tags(root: &mut SceneNode) {
            root.capabilities
                .retain(|capability| capability.type_name() != "tag");
        }

        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 0, 50);

        let instance = pool.acquire(
            &mut scene,
            Vec3::new(4.0, 0.0, -2.0),
            Quat::from_rotation_y(1.0),
            None,
        );
        scene.set_release_hook(instance, Some(strip_tags));
        scene
            .object_mut(instance)
            .expect("object")
            .root_mut()
            .capabilities
            .push(Capability::Tag("scorched".to_string()));

        assert!(pool.release(&mut scene, instance));

        let object = scene.object(instance).expect("object");
        assert!(!object.is_active());
        assert_eq!(object.parent(), Some(pool.holding_scope()));
        assert_eq!(object.root().transform, Transform::IDENTITY);
        assert!(!object.root().has_capability("tag"));
    }

    #[test]
    fn recycled_instance_is_identity_preserved() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 0, 50);

        let first = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert!(pool.release(&mut scene, first));
        let second = pool.acquire(&mut scene, Vec3::ONE, Quat::IDENTITY, None);

        assert_eq!(first, second);
    }

    #[test]
    fn cleanup_respects_the_floor_and_never_touches_active() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 0, 50);

        let mut held = Vec::new();
        for _ in 0..10 {
            held.push(pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None));
        }
        for instance in held {
            pool.release(&mut scene, instance);
        }
        assert_eq!(pool.available_count(), 10);

        // floor = max(5, 50 / 4) = 12 > 10, so nothing is destroyed
        assert_eq!(pool.cleanup_floor(), 12);
        assert_eq!(pool.cleanup(&mut scene, None), 0);
        assert_eq!(pool.available_count(), 10);

        let active = pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert_eq!(pool.cleanup(&mut scene, Some(2)), 7);
        assert_eq!(pool.available_count(), 2);
        assert!(pool.is_active(active));
        assert!(scene.contains(active));
    }

    #[test]
    fn memory_usage_scales_with_total_instance_count() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 4, 50);
        let parked_only = pool.memory_usage_mb();
        assert!(parked_only > 0.0);

        pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        assert_eq!(pool.memory_usage_mb(), parked_only);

        pool.prepopulate(&mut scene, 8);
        assert!(pool.memory_usage_mb() > parked_only);
    }

    #[test]
    fn destroy_force_releases_active_then_empties_the_pool() {
        let mut scene = Scene::new();
        let mut pool = make_pool(&mut scene, 2, 50);
        pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);
        pool.acquire(&mut scene, Vec3::ZERO, Quat::IDENTITY, None);

        pool.destroy(&mut scene);

        assert_eq!(pool.total_count(), 0);
        assert_eq!(scene.object_count(), 0);
    }
}
