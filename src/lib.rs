//! Two-participant coin arena: authoritative fixed-tick server with latency
//! simulation, and a client that predicts its own body and interpolates the
//! other one.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod net;
pub mod util;
