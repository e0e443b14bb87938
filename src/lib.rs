pub mod catalog;
pub mod configuration;
pub mod diligence;
pub mod error;
pub mod events;
pub mod ledger;
pub mod orders;
pub mod persistence;
pub mod pricing;
pub mod risk;
pub mod settlement;
pub mod snapshot;
pub mod state;
pub mod types;
