mod bundle_cache;

pub use bundle_cache::{cache_key, normalize_query, BundleCache};
