//! Transaction input: raw operator fields and their validated form.
//!
//! Validation checks presence and type only. Whether a given amount,
//! location or velocity is risky is the rule engine's business.

use crate::{
    error::{TransactionField, ValidationError},
    types::AccountId,
};
use serde::{Deserialize, Serialize};

/// The six fields exactly as the operator typed them.
/// An empty (or whitespace-only) string means the field is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTransactionInput {
    pub account_id:         String,
    pub amount:             String,
    pub location:           String,
    pub hour:               String,
    pub transactions_today: String,
    pub days_since_last:    String,
}

/// A transaction whose fields are all present and well-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub account_id:         AccountId,
    pub amount:             f64,
    pub location:           String,
    pub hour:               u8,
    pub transactions_today: u32,
    pub days_since_last:    u32,
}

impl RawTransactionInput {
    /// Check every field in declaration order; the error names the
    /// first one that fails.
    pub fn validate(&self) -> Result<TransactionInput, ValidationError> {
        let account_id = parse_account_id(&self.account_id)?;
        let amount = parse_amount(&self.amount)?;
        let location = require(TransactionField::Location, &self.location)?.to_string();
        let hour = parse_hour(&self.hour)?;
        let transactions_today = parse_count(TransactionField::TransactionsToday, &self.transactions_today)?;
        let days_since_last = parse_count(TransactionField::DaysSinceLast, &self.days_since_last)?;

        Ok(TransactionInput {
            account_id,
            amount,
            location,
            hour,
            transactions_today,
            days_since_last,
        })
    }
}

fn require(field: TransactionField, raw: &str) -> Result<&str, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(value)
}

fn malformed(field: TransactionField, value: &str, reason: &'static str) -> ValidationError {
    ValidationError::Malformed {
        field,
        value: value.to_string(),
        reason,
    }
}

fn parse_account_id(raw: &str) -> Result<AccountId, ValidationError> {
    let field = TransactionField::AccountId;
    let value = require(field, raw)?;
    let is_identifier = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !is_identifier {
        return Err(malformed(field, value, "expected letters, digits, '_' or '-'"));
    }
    Ok(value.to_string())
}

fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
    let field = TransactionField::Amount;
    let value = require(field, raw)?;
    let amount: f64 = value
        .parse()
        .map_err(|_| malformed(field, value, "expected a number"))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(malformed(field, value, "expected a positive amount"));
    }
    Ok(amount)
}

fn parse_hour(raw: &str) -> Result<u8, ValidationError> {
    let field = TransactionField::Hour;
    let value = require(field, raw)?;
    match value.parse::<u8>() {
        Ok(hour) if hour <= 23 => Ok(hour),
        _ => Err(malformed(field, value, "expected an hour from 0 to 23")),
    }
}

fn parse_count(field: TransactionField, raw: &str) -> Result<u32, ValidationError> {
    let value = require(field, raw)?;
    value
        .parse::<u32>()
        .map_err(|_| malformed(field, value, "expected a non-negative integer"))
}
