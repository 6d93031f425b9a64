//! Domain services invoked by the websocket gateway.
//!
//! ARCHITECTURE
//! ============
//! Service modules own routing and state mutation so the gateway can stay
//! focused on transport and connection bookkeeping.

pub mod selector;
pub mod sharing;
