use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a plan template
pub type PlanId = Uuid;
/// unique identifier for a booking
pub type BookingId = Uuid;
/// 1-based position of an installment within its schedule
pub type InstallmentNumber = u32;
/// unique identifier for a recorded payment
pub type PaymentId = Uuid;
/// identifier of a customer record owned by the calling application
pub type CustomerId = Uuid;
/// identifier of a plot record owned by the calling application
pub type PlotId = Uuid;

/// plan template status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Active,
    Inactive,
}

/// recurring payment layered on top of the monthly payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryCadence {
    /// every 3 months
    Quarterly,
    /// every 6 months
    BiYearly,
    /// every 4 months, three times a year
    Triannual,
}

impl SecondaryCadence {
    pub const ALL: [SecondaryCadence; 3] = [
        SecondaryCadence::Quarterly,
        SecondaryCadence::BiYearly,
        SecondaryCadence::Triannual,
    ];

    /// months between two payments
    pub fn period_months(&self) -> u32 {
        match self {
            SecondaryCadence::Quarterly => 3,
            SecondaryCadence::BiYearly => 6,
            SecondaryCadence::Triannual => 4,
        }
    }

    /// number of payments that fit in a tenure
    pub fn occurrences(&self, tenure_months: u32) -> u32 {
        tenure_months / self.period_months()
    }
}

/// kind of scheduled obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentType {
    DownPaymentBalance,
    Monthly,
    Quarterly,
    BiYearly,
    Triannual,
}

impl From<SecondaryCadence> for InstallmentType {
    fn from(cadence: SecondaryCadence) -> Self {
        match cadence {
            SecondaryCadence::Quarterly => InstallmentType::Quarterly,
            SecondaryCadence::BiYearly => InstallmentType::BiYearly,
            SecondaryCadence::Triannual => InstallmentType::Triannual,
        }
    }
}

impl InstallmentType {
    /// sort rank among installments sharing a due date
    pub(crate) fn tie_rank(&self) -> u8 {
        match self {
            InstallmentType::DownPaymentBalance => 0,
            InstallmentType::Monthly => 1,
            InstallmentType::Quarterly | InstallmentType::BiYearly | InstallmentType::Triannual => 2,
        }
    }
}

/// installment status, derived on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    /// derive status from amounts, due date and the current date
    pub fn derive(amount: Money, paid: Money, due_date: NaiveDate, today: NaiveDate) -> Self {
        if paid >= amount {
            InstallmentStatus::Paid
        } else if paid.is_positive() {
            InstallmentStatus::Partial
        } else if due_date < today {
            InstallmentStatus::Overdue
        } else {
            InstallmentStatus::Pending
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

/// how a booking is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// single payment for the whole price, no schedule
    FullPayment,
    /// down payment plus a generated installment schedule
    Installment,
}

/// recorded payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Card,
    Online,
    Other(String),
}
