//! Outbound route candidates: the proxy pool, the client IP registry and the
//! external lists that feed the pool.

mod candidate;
mod pool;
mod registry;
mod sources;

pub use candidate::{PerformanceStats, Protocol, ProxyAddr, ProxyCandidate};
pub use pool::{PoolStats, ProxyPool};
pub use registry::{UserIpEntry, UserIpRegistry};
pub use sources::{
    parse_html_listing, parse_plain_list, sources_from_config, HtmlListingSource,
    PlainListSource, ProxySource, SourceError,
};
