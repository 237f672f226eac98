//! Billing records that hang off an identity.
//!
//! The billing collaborator owns these records; this crate only names the
//! relations and the key they join on ([`super::Identity::billing_key`]).

use serde::{Deserialize, Serialize};

/// Relations from an identity to billing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingRelation {
    /// The card on file (zero or one).
    CreditCard,
    /// The current subscription (zero or one).
    Subscription,
    /// Issued invoices (zero or more).
    Invoices,
}

impl BillingRelation {
    pub const ALL: [BillingRelation; 3] = [
        BillingRelation::CreditCard,
        BillingRelation::Subscription,
        BillingRelation::Invoices,
    ];

    /// Whether an identity can have more than one related record.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Invoices)
    }

    /// Table holding the related records, keyed by `user_id`.
    pub fn table(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_cards",
            Self::Subscription => "subscriptions",
            Self::Invoices => "invoices",
        }
    }
}
