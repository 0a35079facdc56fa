//! Watch-together chat server library.
//!
//! Room coordination core for a chat application with synchronized video
//! playback: presence tracking, per-room leader election, disconnect grace
//! handling, event fan-out and room lifecycle, served over WebSocket with
//! axum.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
