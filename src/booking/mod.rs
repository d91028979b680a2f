pub mod intake;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::payments::Payment;
use crate::types::{BookingId, CustomerId, PaymentType, PlanId, PlotId};

pub use intake::{
    AdmittedBooking, BookingIntake, IntakeAssessment, IntakeErrors, IntakeField, IntakeRequest,
    IntakeViolation, IntakeWarning,
};

/// plot record as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    pub id: PlotId,
    pub price: Money,
    pub size_unit: Decimal,
}

/// sale of one plot to one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub plot_id: PlotId,
    pub plan_id: Option<PlanId>,
    pub total_amount: Money,
    pub payment_type: PaymentType,
    pub down_payment: Money,
    /// cumulative: intake contribution plus recorded payments
    pub paid_amount: Money,
    pub installment_count: u32,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn outstanding(&self) -> Money {
        self.total_amount.saturating_sub(self.paid_amount)
    }

    pub fn is_settled(&self) -> bool {
        self.paid_amount >= self.total_amount
    }

    /// add a completed payment to the cumulative paid amount
    pub fn record_payment(
        &mut self,
        payment: &Payment,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Money> {
        if payment.booking_id != self.id {
            return Err(EngineError::ForeignPayment {
                id: payment.id,
                payment_booking: payment.booking_id,
                booking: self.id,
            });
        }

        if !payment.is_completed() {
            return Err(EngineError::PaymentNotCompleted {
                id: payment.id,
                status: payment.status,
            });
        }

        if !payment.amount.is_positive() {
            return Err(EngineError::InvalidPaymentAmount {
                amount: payment.amount,
            });
        }

        if payment.amount > self.outstanding() {
            return Err(EngineError::ExceedsOutstanding {
                outstanding: self.outstanding(),
                requested: payment.amount,
            });
        }

        self.paid_amount += payment.amount;

        info!(
            booking = %self.id,
            payment = %payment.id,
            amount = %payment.amount,
            paid = %self.paid_amount,
            "payment recorded"
        );

        events.emit(Event::PaymentRecorded {
            booking_id: self.id,
            payment_id: payment.id,
            amount: payment.amount,
            new_paid_amount: self.paid_amount,
            timestamp: time_provider.now(),
        });

        Ok(self.paid_amount)
    }
}
