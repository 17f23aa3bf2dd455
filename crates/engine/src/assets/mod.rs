mod catalog;
mod pool;
mod record;
mod source;
mod variation;

pub use catalog::{AssetCatalog, CatalogConfig, CatalogStats, PoolStats, PLACEHOLDER_TAG};
pub use pool::{InstancePool, PoolConfig, CLEANUP_FLOOR_MIN};
pub use record::{AssetRecord, IntegritySnapshot, IntegrityViolation, Template, TemplateId};
pub use source::{AssetSource, AssetSourceError, StaticAssetSource};
pub use variation::{VariationError, VariationKind, VariationPoint, VariationValue};
