//! Quiz hosting backend: a SQLite-backed question bank behind a JSON/HTTP
//! API, and a WebSocket session coordinator that lets a host run a live
//! multiple-choice quiz for connected players.

pub mod api;
pub mod config;
pub mod session;
pub mod store;
