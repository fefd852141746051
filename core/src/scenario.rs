//! Quick test scenarios and the operator's pick lists.

use crate::transaction::RawTransactionInput;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const KNOWN_ACCOUNTS: [&str; 4] = ["12345", "67890", "11111", "22222"];

pub const KNOWN_LOCATIONS: [&str; 7] = [
    "New York",
    "Los Angeles",
    "Chicago",
    "Miami",
    "Moscow",
    "London",
    "Tokyo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Normal,
    HighAmount,
    ForeignLocation,
    HighVelocity,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Normal,
        Scenario::HighAmount,
        Scenario::ForeignLocation,
        Scenario::HighVelocity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Normal          => "normal",
            Scenario::HighAmount      => "high_amount",
            Scenario::ForeignLocation => "foreign_location",
            Scenario::HighVelocity    => "high_velocity",
        }
    }

    /// Field values, as the operator form would hold them.
    pub fn input(self) -> RawTransactionInput {
        let (account, amount, location, hour, count, days) = match self {
            Scenario::Normal          => ("12345", "150", "New York", "14", "2", "1"),
            Scenario::HighAmount      => ("12345", "2000", "New York", "14", "2", "1"),
            Scenario::ForeignLocation => ("67890", "500", "Moscow", "2", "1", "5"),
            Scenario::HighVelocity    => ("11111", "400", "Chicago", "15", "6", "2"),
        };
        RawTransactionInput {
            account_id:         account.into(),
            amount:             amount.into(),
            location:           location.into(),
            hour:               hour.into(),
            transactions_today: count.into(),
            days_since_last:    days.into(),
        }
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Scenario::ALL.iter().map(|sc| sc.name()).collect();
                format!("unknown scenario '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
