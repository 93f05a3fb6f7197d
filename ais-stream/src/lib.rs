#![deny(rust_2018_idioms)]

//! Consumes the aisstream.io websocket feed for a catalog of vessels and
//! keeps their last-known positions.

pub mod batcher;
pub mod catalog;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod normalizer;
pub mod settings;
pub mod startup;
pub mod subscription;
pub mod telemetry;
pub mod vessel_log;
