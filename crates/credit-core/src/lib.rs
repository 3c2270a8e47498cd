//! # Credit Core
//!
//! Deterministic credit scoring for DeFi lending wallets.
//!
//! Raw protocol events go through four stages: the [`normalizer`] resolves
//! heterogeneous record shapes into [`Event`]s, the [`events`] table groups
//! them per wallet, [`features`] reduces each wallet to a [`WalletFeatures`]
//! vector and the [`scorer`] maps that vector to an integer score in
//! `[0, 1000]`. [`report`] and [`analysis`] package a scored batch for
//! output.

pub mod analysis;
pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod models;
pub mod normalizer;
pub mod report;
pub mod scorer;

pub use config::*;
pub use error::*;
pub use events::EventTable;
pub use models::*;
pub use normalizer::normalize;
pub use scorer::{score, score_detailed, CreditScorer};
