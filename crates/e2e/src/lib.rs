//! Staycheck hotel suite
//!
//! Scenarios for the hotel booking application, built on the scenario
//! engine:
//! - Declarative YAML specs for the contact form and the admin room form
//! - An in-process simulation of the application for running the engine
//!   without a browser
//!
//! Run with: cargo test --package staycheck-e2e --test e2e

pub mod hotel;
pub mod sim;

pub use hotel::{contact_form, hotel_forms, room_form, ADMIN_ROLE};
pub use sim::{Faults, SimFactory, SimulatedHotel};
