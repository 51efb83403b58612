//! API Module
//!
//! HTTP handlers and routing for the local host bridge. The bridge is how a
//! renderer process reaches the pools; it adds no caching behaviour of its own.
//!
//! # Endpoints
//! - `PUT /pool/set`, `GET /pool/get/:key`, `DELETE /pool/del/:key`, `GET /pool/stats`
//! - `GET /icons/:key`, `POST /icons/preload`, `DELETE /icons`, `GET /icons/stats`
//! - `GET /blob/:id` - Serve the bytes behind an icon handle
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
