//! Cache domain - Generic caching abstraction layer

mod clock;
mod key;
mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator};
pub use repository::{compile_pattern, Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
