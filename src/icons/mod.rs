//! Icons Module
//!
//! Icon-specific pool: fetches icon bytes, materialises them as revocable
//! handles and keeps handle lifetimes tied to pool membership.

mod blob;
mod fetch;
mod pool;
mod registry;


pub use blob::{IconBlob, IconHandle, BLOB_SCHEME};
pub use fetch::{HttpFetcher, IconFetcher};
pub use pool::{
    IconPool, IconPoolBuilder, IconRequest, PreloadReport, VisibleRange, DEFAULT_PRELOAD_CHUNK,
    ICON_PRIORITY,
};
pub use registry::{BlobRegistry, HandleRegistry, HANDLE_PREFIX};
