//! tapd — token scans become launch actions.
//!
//! Physical token scans (NFC tags, file-based virtual readers) are
//! turned into launch actions on a host device, tracking which
//! software is currently running so that removing a token can
//! optionally terminate it after a grace period.
//!
//! Pipeline: readers push scans onto a shared channel; a single
//! coordinator debounces them and runs the exit-timer state machine;
//! approved tokens go to the dispatcher, which resolves mapping
//! overrides and interprets the launch text against a [`platform`]
//! implementation. [`service::ServiceHandle`] is the front door for
//! API/CLI layers.

pub mod cli;
pub mod config;
pub mod db;
pub mod launcher;
pub mod platform;
pub mod reader;
pub mod service;
pub mod token;
