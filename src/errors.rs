use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BookingId, InstallmentNumber, PaymentId, PaymentStatus};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ambiguous secondary cadence: {populated} additional payment types are populated")]
    AmbiguousSecondaryCadence {
        populated: usize,
    },

    #[error("date out of range: {start} plus {months} months")]
    DateOutOfRange {
        start: NaiveDate,
        months: u32,
    },

    #[error("installment {number} does not belong to this schedule")]
    UnknownInstallment {
        number: InstallmentNumber,
    },

    #[error("payment {id} belongs to booking {payment_booking}, not {booking}")]
    ForeignPayment {
        id: PaymentId,
        payment_booking: BookingId,
        booking: BookingId,
    },

    #[error("payment {id} is {status:?}, only completed payments can be recorded")]
    PaymentNotCompleted {
        id: PaymentId,
        status: PaymentStatus,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment exceeds outstanding balance: outstanding {outstanding}, requested {requested}")]
    ExceedsOutstanding {
        outstanding: Money,
        requested: Money,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("malformed configuration: {0}")]
    MalformedConfiguration(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
