use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use glam::{Quat, Vec3};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::scene::{Capability, InstanceId, Scene, SceneNode, ScopeId};

use super::pool::{InstancePool, PoolConfig};
use super::record::{AssetRecord, Template, TemplateId};
use super::source::AssetSource;
use super::variation::{apply_point, VariationValue};

pub const PLACEHOLDER_TAG: &str = "missing_asset";

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub initial_pool_size: usize,
    pub max_pool_size: usize,
    pub cleanup_interval_seconds: f32,
    pub memory_threshold_mb: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: 5,
            max_pool_size: 50,
            cleanup_interval_seconds: 30.0,
            memory_threshold_mb: 256.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolStats {
    pub path: String,
    pub active: usize,
    pub available: usize,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogStats {
    pub pool_count: usize,
    pub active_total: usize,
    pub available_total: usize,
    pub memory_mb: f64,
    pub loaded_records: usize,
    pub pools: Vec<PoolStats>,
}

/// Façade over records, pools, and instance ownership. All scene-mutating
/// operations are synchronous and take the scene by `&mut`; callers
/// serialize access by ownership rather than by locking.
pub struct AssetCatalog {
    source: Arc<dyn AssetSource>,
    config: CatalogConfig,
    records: HashMap<String, AssetRecord>,
    paths_by_template: HashMap<TemplateId, String>,
    pools: HashMap<String, InstancePool>,
    record_by_instance: HashMap<InstanceId, String>,
    next_template: u64,
    cleanup_elapsed: f32,
}

impl AssetCatalog {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self::with_config(source, CatalogConfig::default())
    }

    pub fn with_config(source: Arc<dyn AssetSource>, config: CatalogConfig) -> Self {
        Self {
            source,
            config,
            records: HashMap::new(),
            paths_by_template: HashMap::new(),
            pools: HashMap::new(),
            record_by_instance: HashMap::new(),
            next_template: 1,
            cleanup_elapsed: 0.0,
        }
    }

    pub fn init(&self) {
        info!(
            initial_pool_size = self.config.initial_pool_size,
            max_pool_size = self.config.max_pool_size,
            cleanup_interval_seconds = self.config.cleanup_interval_seconds,
            memory_threshold_mb = self.config.memory_threshold_mb,
            "catalog_initialized"
        );
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn record(&self, path: &str) -> Option<&AssetRecord> {
        self.records.get(path)
    }

    pub fn record_mut(&mut self, path: &str) -> Option<&mut AssetRecord> {
        self.records.get_mut(path)
    }

    pub fn record_for_instance(&self, instance: InstanceId) -> Option<&AssetRecord> {
        let path = self.record_by_instance.get(&instance)?;
        self.records.get(path)
    }

    /// Resolves a path to a template, loading through the source on first
    /// use. A path the source cannot resolve yields a placeholder record,
    /// never a hard failure; a source error yields `None`.
    pub async fn load(&mut self, path: &str) -> Option<Template> {
        if path.is_empty() {
            warn!("asset_load_empty_path");
            return None;
        }
        if let Some(record) = self.records.get(path) {
            debug!(path, "asset_cache_hit");
            return Some(record.template().clone());
        }

        let outcome = self.source.load(path).await;
        match outcome {
            Ok(Some(root)) => Some(self.install(path, root)),
            Ok(None) => {
                warn!(path, "asset_missing_using_placeholder");
                let template = self.install(path, placeholder_root(path));
                if let Some(record) = self.records.get_mut(path) {
                    record.set_property("placeholder", serde_json::Value::Bool(true));
                }
                Some(template)
            }
            Err(error) => {
                warn!(path, %error, "asset_load_failed");
                None
            }
        }
    }

    /// Fans out source loads for every uncached path, fans in, then tops
    /// each loaded record's pool up to `pool_size` parked instances.
    /// Per-path failures never abort the batch. Duplicate uncached paths
    /// each reach the source; installation stays first-wins.
    pub async fn preload(&mut self, scene: &mut Scene, paths: &[&str], pool_size: usize) {
        let mut resolved: Vec<&str> = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for &path in paths {
            if path.is_empty() {
                warn!("preload_empty_path_skipped");
            } else if self.records.contains_key(path) {
                resolved.push(path);
            } else {
                pending.push(path);
            }
        }

        let source = Arc::clone(&self.source);
        let fetches = join_all(pending.into_iter().map(|path| {
            let source = Arc::clone(&source);
            async move { (path, source.load(path).await) }
        }))
        .await;

        let mut failed = 0usize;
        for (path, outcome) in fetches {
            let root = match outcome {
                Ok(Some(root)) => root,
                Ok(None) => {
                    warn!(path, "asset_missing_using_placeholder");
                    placeholder_root(path)
                }
                Err(error) => {
                    warn!(path, %error, "preload_path_failed");
                    failed += 1;
                    continue;
                }
            };
            self.install(path, root);
            resolved.push(path);
        }

        for path in &resolved {
            if let Some(pool) = self.ensure_pool(scene, path) {
                pool.prepopulate(scene, pool_size);
            }
        }

        info!(
            requested = paths.len(),
            resolved = resolved.len(),
            failed,
            pool_size,
            "preload_complete"
        );
    }

    /// Spawns from the template's pool and records ownership. A template
    /// this catalog never loaded degrades to an unpooled direct spawn.
    pub fn instantiate(
        &mut self,
        scene: &mut Scene,
        template: &Template,
        position: Vec3,
        rotation: Quat,
        parent: Option<ScopeId>,
    ) -> InstanceId {
        let Some(path) = self.paths_by_template.get(&template.id()).cloned() else {
            warn!(
                template_id = template.id().0,
                "untracked_template_direct_spawn"
            );
            return direct_spawn(scene, template, position, rotation, parent);
        };

        let Some(pool) = self.ensure_pool(scene, &path) else {
            // record vanished out from under the template map; degrade the
            // same way as an untracked template
            warn!(path = %path, "record_missing_direct_spawn");
            return direct_spawn(scene, template, position, rotation, parent);
        };
        let instance = pool.acquire(scene, position, rotation, parent);
        self.record_by_instance.insert(instance, path);
        instance
    }

    /// Returns an instance to its pool; instances this catalog does not own
    /// are destroyed directly rather than pooled.
    pub fn release(&mut self, scene: &mut Scene, instance: InstanceId) {
        if !scene.contains(instance) {
            warn!(instance = instance.0, "release_unknown_instance");
            return;
        }
        match self.record_by_instance.remove(&instance) {
            Some(path) => match self.pools.get_mut(&path) {
                Some(pool) => {
                    if !pool.release(scene, instance) {
                        warn!(instance = instance.0, path = %path, "release_not_active");
                    }
                }
                None => {
                    warn!(instance = instance.0, path = %path, "release_pool_missing");
                    scene.despawn(instance);
                }
            },
            None => {
                debug!(instance = instance.0, "release_untracked_destroying");
                scene.despawn(instance);
            }
        }
    }

    /// Applies the record's variation points named in `values` to a tracked
    /// instance. Each offending point is skipped with a warning; the rest
    /// still apply.
    pub fn apply_variations(
        &self,
        scene: &mut Scene,
        instance: InstanceId,
        values: &HashMap<String, VariationValue>,
    ) {
        if values.is_empty() {
            return;
        }
        let Some(path) = self.record_by_instance.get(&instance) else {
            debug!(instance = instance.0, "variations_on_untracked_instance");
            return;
        };
        let Some(record) = self.records.get(path) else {
            return;
        };
        let Some(object) = scene.object_mut(instance) else {
            warn!(instance = instance.0, "variations_instance_missing");
            return;
        };

        let root = object.root_mut();
        let mut applied = 0usize;
        for point in record.variation_points() {
            let Some(value) = values.get(&point.name) else {
                continue;
            };
            match apply_point(root, point, value) {
                Ok(()) => applied += 1,
                Err(error) => {
                    warn!(
                        instance = instance.0,
                        point = %point.name,
                        %error,
                        "variation_skipped"
                    );
                }
            }
        }
        debug!(
            instance = instance.0,
            applied,
            supplied = values.len(),
            "variations_applied"
        );
    }

    /// Compares a tracked instance against its record's snapshot. Untracked
    /// instances are vacuously valid. Detection only, never repair.
    pub fn validate_integrity(&self, scene: &Scene, instance: InstanceId) -> bool {
        let Some(path) = self.record_by_instance.get(&instance) else {
            return true;
        };
        let (Some(record), Some(object)) = (self.records.get(path), scene.object(instance)) else {
            return true;
        };

        let violations = record.integrity().check(object.root());
        if violations.is_empty() {
            return true;
        }
        for violation in &violations {
            warn!(
                instance = instance.0,
                path = %path,
                %violation,
                "integrity_violation"
            );
        }
        false
    }

    /// Trims pools, fewest active instances first, until the estimate
    /// falls to or below `threshold_mb`. Returns instances destroyed.
    pub fn perform_cleanup(&mut self, scene: &mut Scene, threshold_mb: f64) -> usize {
        let usage_before = self.current_memory_usage_mb();
        if usage_before <= threshold_mb {
            debug!(
                usage_mb = usage_before,
                threshold_mb, "cleanup_below_threshold"
            );
            return 0;
        }

        let mut order: Vec<(usize, String)> = self
            .pools
            .iter()
            .map(|(path, pool)| (pool.active_count(), path.clone()))
            .collect();
        order.sort();

        let mut removed = 0usize;
        for (_, path) in order {
            if self.current_memory_usage_mb() <= threshold_mb {
                break;
            }
            if let Some(pool) = self.pools.get_mut(&path) {
                removed += pool.cleanup(scene, None);
            }
        }

        info!(
            removed,
            usage_before_mb = usage_before,
            usage_after_mb = self.current_memory_usage_mb(),
            threshold_mb,
            "cleanup_summary"
        );
        removed
    }

    /// Driven by an external scheduler; runs a pressure-gated cleanup once
    /// per configured interval.
    pub fn tick(&mut self, scene: &mut Scene, dt_seconds: f32) {
        self.cleanup_elapsed += dt_seconds;
        if self.cleanup_elapsed < self.config.cleanup_interval_seconds {
            return;
        }
        self.cleanup_elapsed = 0.0;
        if self.current_memory_usage_mb() > self.config.memory_threshold_mb {
            self.perform_cleanup(scene, self.config.memory_threshold_mb);
        }
    }

    /// Tears everything down: pools destroyed, records and ownership
    /// dropped. The catalog is reusable but empty afterwards.
    pub fn dispose(&mut self, scene: &mut Scene) {
        for pool in self.pools.values_mut() {
            pool.destroy(scene);
        }
        info!(
            pools = self.pools.len(),
            records = self.records.len(),
            "catalog_disposed"
        );
        self.pools.clear();
        self.records.clear();
        self.paths_by_template.clear();
        self.record_by_instance.clear();
    }

    pub fn current_memory_usage_mb(&self) -> f64 {
        self.pools.values().map(InstancePool::memory_usage_mb).sum()
    }

    pub fn statistics(&self) -> CatalogStats {
        let mut pools: Vec<PoolStats> = self
            .pools
            .values()
            .map(|pool| PoolStats {
                path: pool.path().to_string(),
                active: pool.active_count(),
                available: pool.available_count(),
                memory_mb: pool.memory_usage_mb(),
            })
            .collect();
        pools.sort_by(|a, b| a.path.cmp(&b.path));

        CatalogStats {
            pool_count: pools.len(),
            active_total: pools.iter().map(|stats| stats.active).sum(),
            available_total: pools.iter().map(|stats| stats.available).sum(),
            memory_mb: self.current_memory_usage_mb(),
            loaded_records: self.records.len(),
            pools,
        }
    }

    /// First-wins: a record that already exists for `path` is kept, so the
    /// created-once-per-path invariant holds even when a preload batch
    /// fetched the same path twice.
    fn install(&mut self, path: &str, root: SceneNode) -> Template {
        if let Some(existing) = self.records.get(path) {
            return existing.template().clone();
        }

        let template = Template::new(TemplateId(self.next_template), Arc::new(root));
        self.next_template = self.next_template.saturating_add(1);
        let record = AssetRecord::new(path, template.clone());
        info!(
            path,
            template_id = template.id().0,
            nodes = template.root().node_count(),
            variation_points = record.variation_points().len(),
            "asset_record_created"
        );
        self.paths_by_template.insert(template.id(), path.to_string());
        self.records.insert(path.to_string(), record);
        template
    }

    fn ensure_pool(&mut self, scene: &mut Scene, path: &str) -> Option<&mut InstancePool> {
        if !self.pools.contains_key(path) {
            let template = self.records.get(path)?.template().clone();
            let mut pool = InstancePool::new(
                scene,
                path,
                template,
                PoolConfig {
                    initial_size: self.config.initial_pool_size,
                    max_size: self.config.max_pool_size,
                },
            );
            pool.prepopulate(scene, self.config.initial_pool_size);
            info!(
                path,
                initial_size = self.config.initial_pool_size,
                max_size = self.config.max_pool_size,
                "pool_created"
            );
            self.pools.insert(path.to_string(), pool);
        }
        self.pools.get_mut(path)
    }
}

fn direct_spawn(
    scene: &mut Scene,
    template: &Template,
    position: Vec3,
    rotation: Quat,
    parent: Option<ScopeId>,
) -> InstanceId {
    let instance = scene.spawn(template.root().clone());
    if let Some(object) = scene.object_mut(instance) {
        object.root_mut().transform.position = position;
        object.root_mut().transform.rotation = rotation;
    }
    scene.set_parent(instance, parent);
    instance
}

fn placeholder_root(path: &str) -> SceneNode {
    SceneNode::new(format!("missing:{path}"))
        .with_capability(Capability::Tag(PLACEHOLDER_TAG.to_string()))
}
