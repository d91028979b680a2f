pub mod booking;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod payments;
pub mod plan;
pub mod schedule;
pub mod types;

// re-export key types
pub use booking::{
    AdmittedBooking, Booking, BookingIntake, IntakeAssessment, IntakeErrors, IntakeField,
    IntakeRequest, IntakeViolation, IntakeWarning, Plot,
};
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use payments::{
    BookingSummary, DownPaymentBreakdown, LinkMethod, NextDue, Payment, PaymentLink,
    PaymentReconciler, ReconciledInstallment, Reconciliation,
};
pub use plan::{
    DownPaymentRule, PlanTemplate, PlanTemplateBuilder, PlanTotals, PlanValidation, PlanValidator,
    PlanViolation, ScheduleTerms, SecondaryPayment,
};
pub use schedule::{Installment, Schedule, ScheduleGenerator};
pub use types::{
    BookingId, CustomerId, InstallmentNumber, InstallmentStatus, InstallmentType, PaymentId,
    PaymentMethod, PaymentStatus, PaymentType, PlanId, PlanStatus, PlotId, SecondaryCadence,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
