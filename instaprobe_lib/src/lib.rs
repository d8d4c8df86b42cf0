//! Library layer for instaprobe: proxy rotation, cached fetching and
//! multi-strategy profile extraction.
//!
//! Wraps the `instaprobe_api` client with a scored proxy pool, a registry of
//! client IPs used as routes, TTL caches, and a fallback chain of parsers.

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod profile;
pub mod proxy;
pub mod scraper;
pub mod validation;

pub use instaprobe_api;
pub use instaprobe_api::types;

pub use cache::MemoryCache;
pub use config::{ConfigError, ScraperConfig, SourceConfig, SourceFormat};
pub use error::{ErrorKind, ScrapeError};
pub use extract::{Extraction, ExtractionPipeline, Strategy};
pub use fetch::{CachedResponse, FetchOrchestrator, FetchOutcome, Origin, Route};
pub use profile::{
    Confidence, Identity, Post, PostType, PostsSummary, Profile, ProfileData, ScrapedProfile,
    Statistics,
};
pub use proxy::{PoolStats, Protocol, ProxyAddr, ProxyCandidate, ProxyPool, UserIpRegistry};
pub use scraper::{ConnectionReport, ConnectionStatus, ProfileScraper, ScrapeResult};
