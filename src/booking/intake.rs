use std::collections::BTreeMap;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::events::{Event, EventStore};
use crate::plan::{PlanTemplate, PlanValidator, PlanViolation};
use crate::schedule::{Schedule, ScheduleGenerator};
use crate::types::{CustomerId, PaymentType, PlanId};

use super::{Booking, Plot};

/// form field a violation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeField {
    Customer,
    Plot,
    Plan,
    InstallmentCount,
    DownPayment,
    PaidAmount,
}

/// reason a booking request cannot be accepted
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IntakeViolation {
    #[error("customer is required")]
    CustomerRequired,

    #[error("plot is required")]
    PlotRequired,

    #[error("a payment plan is required for installment bookings")]
    PlanRequired,

    #[error("plan {plan_id} is inactive")]
    PlanInactive { plan_id: PlanId },

    #[error("plan {plan_id} has {} validation error(s)", .errors.len())]
    PlanNotEligible {
        plan_id: PlanId,
        errors: Vec<PlanViolation>,
    },

    #[error("installment count must be at least 1")]
    InstallmentCountRequired,

    #[error("installment count {installment_count} exceeds the maximum of {max}")]
    InstallmentCountOutOfRange { installment_count: u32, max: u32 },

    #[error(
        "{installment_count} installments do not cover the plot price (short by {shortfall}, over by {overpayment})"
    )]
    InstallmentCountUnbalanced {
        installment_count: u32,
        shortfall: Money,
        overpayment: Money,
    },

    #[error("schedule could not be generated: {reason}")]
    ScheduleUnavailable { reason: String },

    #[error("paid amount cannot be negative: {amount}")]
    NegativePaidAmount { amount: Money },

    #[error("paid amount {paid} exceeds total amount {total}")]
    PaidExceedsTotal { paid: Money, total: Money },

    #[error("paid amount {paid} exceeds down payment {down_payment}")]
    PaidExceedsDownPayment { paid: Money, down_payment: Money },

    #[error("down payment {down_payment} exceeds total amount {total}")]
    DownPaymentExceedsTotal { down_payment: Money, total: Money },
}

impl IntakeViolation {
    pub fn field(&self) -> IntakeField {
        match self {
            IntakeViolation::CustomerRequired => IntakeField::Customer,
            IntakeViolation::PlotRequired => IntakeField::Plot,
            IntakeViolation::PlanRequired
            | IntakeViolation::PlanInactive { .. }
            | IntakeViolation::PlanNotEligible { .. }
            | IntakeViolation::ScheduleUnavailable { .. } => IntakeField::Plan,
            IntakeViolation::InstallmentCountRequired
            | IntakeViolation::InstallmentCountOutOfRange { .. }
            | IntakeViolation::InstallmentCountUnbalanced { .. } => IntakeField::InstallmentCount,
            IntakeViolation::DownPaymentExceedsTotal { .. } => IntakeField::DownPayment,
            IntakeViolation::NegativePaidAmount { .. }
            | IntakeViolation::PaidExceedsTotal { .. }
            | IntakeViolation::PaidExceedsDownPayment { .. } => IntakeField::PaidAmount,
        }
    }
}

/// every violation of a request, in detection order
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[error("booking rejected with {} problem(s)", .0.len())]
pub struct IntakeErrors(Vec<IntakeViolation>);

impl IntakeErrors {
    /// add a violation unless an identical one is already present
    pub fn push(&mut self, violation: IntakeViolation) {
        if !self.0.contains(&violation) {
            self.0.push(violation);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntakeViolation> {
        self.0.iter()
    }

    pub fn contains(&self, violation: &IntakeViolation) -> bool {
        self.0.contains(violation)
    }

    pub fn for_field(&self, field: IntakeField) -> impl Iterator<Item = &IntakeViolation> {
        self.0.iter().filter(move |v| v.field() == field)
    }

    /// one message per offending field, multiple problems joined
    pub fn field_messages(&self) -> BTreeMap<IntakeField, String> {
        let mut messages: BTreeMap<IntakeField, String> = BTreeMap::new();
        for violation in &self.0 {
            messages
                .entry(violation.field())
                .and_modify(|m| {
                    m.push_str("; ");
                    m.push_str(&violation.to_string());
                })
                .or_insert_with(|| violation.to_string());
        }
        messages
    }
}

/// non-blocking observation about a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IntakeWarning {
    /// plan's stated price is advisory, the plot price is kept
    PlanPriceDivergence {
        plan_price: Money,
        plot_price: Money,
        difference: Money,
    },
}

/// booking form as submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub customer_id: Option<CustomerId>,
    pub plot: Option<Plot>,
    pub plan: Option<PlanTemplate>,
    pub payment_type: PaymentType,
    pub paid_amount: Money,
    /// defaults to the plan tenure
    pub installment_count: Option<u32>,
    pub start_date: NaiveDate,
}

/// derived fields plus everything found wrong with a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeAssessment {
    pub total_amount: Money,
    pub down_payment: Money,
    pub installment_count: u32,
    pub warnings: Vec<IntakeWarning>,
    pub errors: IntakeErrors,
}

impl IntakeAssessment {
    pub fn is_acceptable(&self) -> bool {
        self.errors.is_empty()
    }
}

/// accepted booking with its schedule, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittedBooking {
    pub booking: Booking,
    pub schedule: Option<Schedule>,
    pub warnings: Vec<IntakeWarning>,
}

/// admission rules for new bookings
#[derive(Debug, Clone, Default)]
pub struct BookingIntake {
    config: EngineConfig,
    validator: PlanValidator,
    generator: ScheduleGenerator,
}

impl BookingIntake {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: PlanValidator::new(config.clone()),
            generator: ScheduleGenerator::new(),
            config,
        }
    }

    /// derive amounts and collect every violation
    pub fn assess(&self, request: &IntakeRequest) -> IntakeAssessment {
        let mut errors = IntakeErrors::default();
        let mut warnings = Vec::new();

        if request.customer_id.is_none() {
            errors.push(IntakeViolation::CustomerRequired);
        }

        // plot price is authoritative
        let total_amount = match &request.plot {
            Some(plot) => plot.price,
            None => {
                errors.push(IntakeViolation::PlotRequired);
                Money::ZERO
            }
        };

        if let (Some(plan), Some(plot)) = (&request.plan, &request.plot) {
            let difference = (plan.plot_price - plot.price).abs();
            if difference > self.config.price_divergence_tolerance {
                warnings.push(IntakeWarning::PlanPriceDivergence {
                    plan_price: plan.plot_price,
                    plot_price: plot.price,
                    difference,
                });
            }
        }

        if request.paid_amount.is_negative() {
            errors.push(IntakeViolation::NegativePaidAmount {
                amount: request.paid_amount,
            });
        }

        let (down_payment, installment_count) = match request.payment_type {
            PaymentType::FullPayment => {
                if request.plot.is_some() && request.paid_amount > total_amount {
                    errors.push(IntakeViolation::PaidExceedsTotal {
                        paid: request.paid_amount,
                        total: total_amount,
                    });
                }
                (Money::ZERO, 0)
            }
            PaymentType::Installment => self.assess_installment(request, &mut errors),
        };

        if request.plot.is_some() {
            if down_payment > total_amount {
                errors.push(IntakeViolation::DownPaymentExceedsTotal {
                    down_payment,
                    total: total_amount,
                });
            }
            if request.paid_amount > total_amount {
                errors.push(IntakeViolation::PaidExceedsTotal {
                    paid: request.paid_amount,
                    total: total_amount,
                });
            }
        }

        IntakeAssessment {
            total_amount,
            down_payment,
            installment_count,
            warnings,
            errors,
        }
    }

    fn assess_installment(&self, request: &IntakeRequest, errors: &mut IntakeErrors) -> (Money, u32) {
        let Some(plan) = &request.plan else {
            errors.push(IntakeViolation::PlanRequired);
            // without a plan only an explicit count can be judged
            if let Some(count) = request.installment_count {
                self.check_count_range(count, errors);
            }
            return (Money::ZERO, request.installment_count.unwrap_or(0));
        };

        if !plan.is_active() {
            errors.push(IntakeViolation::PlanInactive { plan_id: plan.id });
        }

        let validation = self.validator.validate(plan);
        if !validation.is_valid() {
            errors.push(IntakeViolation::PlanNotEligible {
                plan_id: plan.id,
                errors: validation.errors,
            });
        }

        let down_payment = validation.totals.down_payment;
        let installment_count = request.installment_count.unwrap_or(plan.tenure_months);
        if self.check_count_range(installment_count, errors) && installment_count != plan.tenure_months {
            self.check_count_balance(plan, installment_count, errors);
        }

        if request.paid_amount > down_payment {
            errors.push(IntakeViolation::PaidExceedsDownPayment {
                paid: request.paid_amount,
                down_payment,
            });
        }

        (down_payment, installment_count)
    }

    /// true when the count lies within `1..=max_tenure_months`
    fn check_count_range(&self, installment_count: u32, errors: &mut IntakeErrors) -> bool {
        if installment_count < 1 {
            errors.push(IntakeViolation::InstallmentCountRequired);
            return false;
        }
        if installment_count > self.config.max_tenure_months {
            errors.push(IntakeViolation::InstallmentCountOutOfRange {
                installment_count,
                max: self.config.max_tenure_months,
            });
            return false;
        }
        true
    }

    /// an overridden count must still pay off the plot within the plan tolerances
    fn check_count_balance(&self, plan: &PlanTemplate, installment_count: u32, errors: &mut IntakeErrors) {
        // ambiguous cadences are already reported as plan errors
        let Ok(mut terms) = plan.schedule_terms() else {
            return;
        };
        terms.tenure_months = installment_count;

        let totals = self.validator.compute_terms_totals(&terms);
        if totals.shortfall > self.config.shortfall_tolerance
            || totals.overpayment > self.config.overpayment_tolerance.of(terms.plot_price)
        {
            errors.push(IntakeViolation::InstallmentCountUnbalanced {
                installment_count,
                shortfall: totals.shortfall,
                overpayment: totals.overpayment,
            });
        }
    }

    /// accept a request, producing the booking and, for installments, its schedule
    pub fn admit(
        &self,
        request: &IntakeRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<AdmittedBooking, IntakeErrors> {
        let mut assessment = self.assess(request);

        let (Some(customer_id), Some(plot)) = (request.customer_id, &request.plot) else {
            return Err(assessment.errors);
        };

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id,
            plot_id: plot.id,
            plan_id: request.plan.as_ref().map(|p| p.id),
            total_amount: assessment.total_amount,
            payment_type: request.payment_type,
            down_payment: assessment.down_payment,
            paid_amount: request.paid_amount,
            installment_count: assessment.installment_count,
            start_date: request.start_date,
            created_at: time_provider.now(),
        };

        let schedule = match (request.payment_type, &request.plan) {
            (PaymentType::Installment, Some(plan)) if assessment.is_acceptable() => {
                match self.schedule_for(plan, &booking) {
                    Ok(schedule) => Some(schedule),
                    Err(reason) => {
                        assessment
                            .errors
                            .push(IntakeViolation::ScheduleUnavailable { reason });
                        None
                    }
                }
            }
            _ => None,
        };

        if !assessment.is_acceptable() {
            warn!(
                customer = %customer_id,
                plot = %plot.id,
                problems = assessment.errors.len(),
                "booking rejected"
            );
            return Err(assessment.errors);
        }

        let now = time_provider.now();
        for warning in &assessment.warnings {
            let IntakeWarning::PlanPriceDivergence { plan_price, plot_price, .. } = warning;
            warn!(plot = %plot.id, %plan_price, %plot_price, "plan price diverges from plot price");
            if let Some(plan) = &request.plan {
                events.emit(Event::PlanPriceDivergence {
                    plan_id: plan.id,
                    plot_id: plot.id,
                    plan_price: *plan_price,
                    plot_price: *plot_price,
                    timestamp: now,
                });
            }
        }

        events.emit(Event::BookingAdmitted {
            booking_id: booking.id,
            customer_id,
            plot_id: plot.id,
            payment_type: booking.payment_type,
            total_amount: booking.total_amount,
            paid_amount: booking.paid_amount,
            timestamp: now,
        });

        if let (Some(schedule), Some(plan)) = (&schedule, &request.plan) {
            events.emit(Event::ScheduleGenerated {
                booking_id: booking.id,
                plan_id: plan.id,
                installments: schedule.len(),
                start_date: schedule.start_date,
                end_date: schedule.end_date,
            });
        }

        info!(
            booking = %booking.id,
            payment_type = ?booking.payment_type,
            total = %booking.total_amount,
            paid = %booking.paid_amount,
            "booking admitted"
        );

        Ok(AdmittedBooking {
            booking,
            schedule,
            warnings: assessment.warnings,
        })
    }

    /// plan terms with the booking's installment count as tenure
    fn schedule_for(&self, plan: &PlanTemplate, booking: &Booking) -> Result<Schedule, String> {
        let mut terms = plan.schedule_terms().map_err(|e| e.to_string())?;
        terms.tenure_months = booking.installment_count;

        self.generator
            .generate(&terms, booking.start_date, booking.paid_amount)
            .map_err(|e| e.to_string())
    }
}
