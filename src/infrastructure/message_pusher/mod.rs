//! Message pushing implementations.
//!
//! Concrete implementations of the `MessagePusher` trait. Currently only the
//! WebSocket-backed pusher; the seam exists so a broker-backed fan-out could
//! slot in for multi-process deployments.

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
