//! A transparent Minecraft Bedrock proxy for Realms.
//!
//! The proxy sits between a locally-running client and a hosted Realm,
//! relaying the packet stream unmodified in both directions. Along the way
//! it maintains a live model of the session — identity, position,
//! inventory, chat, roster, world metadata, entity tracking — and exposes
//! that model, together with a handful of write-side actions, over a
//! stdio tool channel.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    clippy::dbg_macro
)]

pub mod config;
pub mod control;
pub mod interceptor;
pub mod listener;
pub mod mcp;
pub mod resolver;
pub mod session;
pub mod state;

#[cfg(test)]
mod tests;
