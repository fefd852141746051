//! Query builder: one validated transaction becomes one engine goal.
//!
//! Shape (fixed arity, location quoted, everything else bare):
//!   process_transaction(<account>, <amount>, '<location>', <hour>, <count>, <days>).
//!
//! A location containing `'` produces a malformed goal. Locations come
//! from a fixed pick list on the operator side, so this is not escaped.
//!
//! The amount is rendered from the validated `f64`, not from the operator's
//! text: leading zeros and trailing fractional zeros are dropped, and digits
//! past `f64` precision (about 17 significant) are rounded. The engine sees
//! the same value that is recorded in the session history.

use crate::transaction::TransactionInput;
use std::fmt;

/// Name of the goal the policy file is expected to define.
pub const ENGINE_GOAL: &str = "process_transaction";

/// The goal text for a single analysis. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineQuery(String);

impl EngineQuery {
    pub fn build(input: &TransactionInput) -> Self {
        Self(format!(
            "{ENGINE_GOAL}({}, {}, '{}', {}, {}, {}).",
            input.account_id,
            input.amount,
            input.location,
            input.hour,
            input.transactions_today,
            input.days_since_last,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
