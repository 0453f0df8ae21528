pub mod manager;
pub mod search;
pub mod traits;

pub use manager::{AppConfig, ConfigManager};
pub use search::{FrontOrder, LocusWeights, SearchConfig};
pub use traits::{ConfigManifest, ConfigSection, FieldManifest};
