//! # lattice-routing
//!
//! Route selection for the Lattice mesh simulator.
//!
//! Four policies implement the [`lattice_net::RoutingPolicy`] seam:
//!
//! - [`hop_count::HopCountRouting`] — breadth-first shortest path
//! - [`wcett::WcettRouting`] — weighted cumulative expected transmission time
//! - [`post::WcettLbPostRouting`] — WCETT-LB with reactive path switching
//! - [`pre::WcettLbPreRouting`] — WCETT-LB with predictive advisories
//!
//! ## Crate structure
//!
//! - [`paths`] — acyclic path enumeration under role and depth constraints
//! - [`metric`] — per-edge ETT and per-path WCETT
//! - [`load`] — WCETT-LB load penalties and congestion signals
//! - [`hop_count`], [`wcett`], [`post`], [`pre`] — the policies
//! - [`tables`] — routing-table population before traffic starts

pub mod hop_count;
pub mod load;
pub mod metric;
pub mod paths;
pub mod post;
pub mod pre;
pub mod tables;
pub mod wcett;

pub use hop_count::HopCountRouting;
pub use load::LbParams;
pub use post::WcettLbPostRouting;
pub use pre::WcettLbPreRouting;
pub use tables::install_policy;
pub use wcett::WcettRouting;
