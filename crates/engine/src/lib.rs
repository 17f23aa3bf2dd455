pub mod assets;
pub mod scene;

pub use assets::{
    AssetCatalog, AssetRecord, AssetSource, AssetSourceError, CatalogConfig, CatalogStats,
    InstancePool, IntegritySnapshot, IntegrityViolation, PoolConfig, PoolStats, StaticAssetSource,
    Template, TemplateId, VariationError, VariationKind, VariationPoint, VariationValue,
    CLEANUP_FLOOR_MIN, PLACEHOLDER_TAG,
};
pub use scene::{
    Capability, InstanceId, Material, ReleaseHook, Rgba, Scene, SceneNode, SceneObject, ScopeId,
    Transform,
};
