//! # rnet-monitor: RNet bus monitor
//!
//! Connects to a Russound RNet serial-to-IP bridge, logs every decoded
//! zone update and can send a single zone action once connected.
//! Reconnects on its own until stopped with Ctrl-C.

pub mod config;
pub mod service;
