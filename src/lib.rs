//! ctlprobe - controller-side network probes.
//!
//! HTTP and TCP probes that report their outcome as structured data, a lookup
//! layer that runs them from JSON keyword parameters, and an asciinema cast
//! converter.

pub mod cast;
pub mod config;
pub mod lookup;
pub mod probe;
