pub mod linking;
pub mod reconciler;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{BookingId, InstallmentNumber, PaymentId, PaymentMethod, PaymentStatus};

pub use linking::{LinkMethod, PaymentLink};
pub use reconciler::{
    BookingSummary, DownPaymentBreakdown, NextDue, PaymentReconciler, ReconciledInstallment,
    Reconciliation,
};

/// recorded money movement against a booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    /// explicit installment link; inferred by the reconciler when absent
    pub installment_number: Option<InstallmentNumber>,
}

impl Payment {
    /// completed payment without an installment link
    pub fn completed(
        booking_id: BookingId,
        amount: Money,
        payment_date: NaiveDate,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            payment_date,
            payment_method,
            status: PaymentStatus::Completed,
            transaction_id: None,
            notes: None,
            installment_number: None,
        }
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn linked_to(mut self, number: InstallmentNumber) -> Self {
        self.installment_number = Some(number);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// notes mark this payment as settling the down payment balance
    pub fn indicates_down_payment(&self) -> bool {
        self.notes
            .as_deref()
            .map(|notes| {
                let notes = notes.to_lowercase();
                notes.contains("down payment") || notes.contains("down_payment")
            })
            .unwrap_or(false)
    }
}
