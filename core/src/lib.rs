//! atm-risk-core: the transaction risk decision pipeline behind the ATM
//! risk desk.
//!
//! Validator → query builder → rule engine → response parser →
//! session history → visualization state. See `pipeline` for the rules
//! that tie the stages together.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod response_parser;
pub mod rule_engine;
pub mod scenario;
pub mod session;
pub mod transaction;
pub mod types;
pub mod visualization;
