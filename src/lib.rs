//! Authenticated chat relay: username/password accounts, signed session
//! tokens, and a WebSocket channel that rebroadcasts every `message` event to
//! all connected clients.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod relay;
pub mod state;
