pub mod hash;
pub mod model;
pub mod normalize;
pub mod store;

pub use model::{CacheStats, LoadStatus};
pub use store::{inspect, FingerprintCache};
