//! QuakeRisk - Earthquake risk console from your terminal.
//!
//! Shows recent earthquakes on a world map colored by predicted risk, lists
//! them most recent first, and asks the risk service for a prediction at any
//! point the operator picks.
//!
//! The risk model and the earthquake feed live behind the service's
//! `/api/earthquakes` and `/api/predict` endpoints; this crate is the client:
//! [`client`] talks to the service, [`controller`] turns gestures into
//! requests and view updates, and [`map`], [`markers`] and [`sidebar`] hold
//! what is on screen.

pub mod client;
pub mod console;
pub mod controller;
pub mod errors;
pub mod map;
pub mod markers;
pub mod models;
pub mod output;
pub mod risk;
pub mod sidebar;
