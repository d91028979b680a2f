use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::decimal::Money;

use super::{DownPaymentRule, PlanTemplate, ScheduleTerms};

/// problem found in a plan template; collected, never thrown
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlanViolation {
    #[error("only one additional payment type allowed ({populated} populated)")]
    MultipleSecondaryCadences { populated: usize },

    #[error("down payment must be specified")]
    DownPaymentRequired,

    #[error("down payment {down_payment} cannot meet or exceed the plot price {plot_price}")]
    DownPaymentTooLarge { down_payment: Money, plot_price: Money },

    #[error("plan falls short of the plot price by {amount}")]
    Shortfall { amount: Money },

    #[error("plan exceeds the plot price by {amount}")]
    Overpayment { amount: Money },

    #[error("tenure of {tenure_months} months is outside 1..={max} months")]
    TenureOutOfRange { tenure_months: u32, max: u32 },

    #[error("down payment percentage {percentage} is outside 0-100")]
    PercentageOutOfRange { percentage: Decimal },

    #[error("{field} cannot be negative: {amount}")]
    NegativeAmount { field: String, amount: Money },
}

/// derived cash-flow figures of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub down_payment: Money,
    pub total_monthly: Money,
    pub total_secondary: Money,
    pub total_planned: Money,
    pub shortfall: Money,
    pub overpayment: Money,
}

/// totals plus every violation found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanValidation {
    #[serde(flatten)]
    pub totals: PlanTotals,
    pub errors: Vec<PlanViolation>,
}

impl PlanValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// human readable messages in violation order
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// down payment required by a rule against a price
pub fn compute_down_payment(plot_price: Money, rule: DownPaymentRule) -> Money {
    match rule {
        DownPaymentRule::Amount(amount) => amount,
        DownPaymentRule::Percentage(pct) => plot_price.percentage(pct),
        DownPaymentRule::None => Money::ZERO,
    }
}

/// plan validator
#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    config: EngineConfig,
}

impl PlanValidator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compute_down_payment(&self, plan: &PlanTemplate) -> Money {
        compute_down_payment(plan.plot_price, plan.down_payment_rule())
    }

    /// totals over every populated cadence, so an invalid plan still reports figures
    pub fn compute_totals(&self, plan: &PlanTemplate) -> PlanTotals {
        let down_payment = self.compute_down_payment(plan);
        let total_monthly = plan.monthly_payment.times(plan.tenure_months);
        let total_secondary = plan
            .secondary_payments()
            .iter()
            .map(|s| s.total(plan.tenure_months))
            .sum();

        build_totals(plan.plot_price, down_payment, total_monthly, total_secondary)
    }

    /// totals of already frozen terms
    pub fn compute_terms_totals(&self, terms: &ScheduleTerms) -> PlanTotals {
        let down_payment = compute_down_payment(terms.plot_price, terms.down_payment);
        let total_monthly = terms.monthly_payment.times(terms.tenure_months);
        let total_secondary = terms
            .secondary
            .map(|s| s.total(terms.tenure_months))
            .unwrap_or(Money::ZERO);

        build_totals(terms.plot_price, down_payment, total_monthly, total_secondary)
    }

    /// validate a plan, collecting every violation
    pub fn validate(&self, plan: &PlanTemplate) -> PlanValidation {
        let totals = self.compute_totals(plan);
        let mut errors = Vec::new();

        let populated = plan.secondary_payments().len();
        if populated > 1 {
            errors.push(PlanViolation::MultipleSecondaryCadences { populated });
        }

        if plan.plot_price.is_positive() {
            if !totals.down_payment.is_positive() {
                errors.push(PlanViolation::DownPaymentRequired);
            } else if totals.down_payment >= plan.plot_price {
                errors.push(PlanViolation::DownPaymentTooLarge {
                    down_payment: totals.down_payment,
                    plot_price: plan.plot_price,
                });
            }
        }

        if totals.shortfall > self.config.shortfall_tolerance {
            errors.push(PlanViolation::Shortfall {
                amount: totals.shortfall,
            });
        }

        if totals.overpayment > self.config.overpayment_tolerance.of(plan.plot_price) {
            errors.push(PlanViolation::Overpayment {
                amount: totals.overpayment,
            });
        }

        if plan.tenure_months == 0 || plan.tenure_months > self.config.max_tenure_months {
            errors.push(PlanViolation::TenureOutOfRange {
                tenure_months: plan.tenure_months,
                max: self.config.max_tenure_months,
            });
        }

        if let Some(pct) = plan.down_payment_percentage {
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                errors.push(PlanViolation::PercentageOutOfRange { percentage: pct });
            }
        }

        errors.extend(negative_amounts(plan));

        debug!(
            plan = %plan.id,
            planned = %totals.total_planned,
            price = %plan.plot_price,
            violations = errors.len(),
            "plan validated"
        );

        PlanValidation { totals, errors }
    }
}

fn build_totals(
    plot_price: Money,
    down_payment: Money,
    total_monthly: Money,
    total_secondary: Money,
) -> PlanTotals {
    let total_planned = down_payment + total_monthly + total_secondary;

    PlanTotals {
        down_payment,
        total_monthly,
        total_secondary,
        total_planned,
        shortfall: plot_price.saturating_sub(total_planned),
        overpayment: total_planned.saturating_sub(plot_price),
    }
}

fn negative_amounts(plan: &PlanTemplate) -> Vec<PlanViolation> {
    let fields = [
        ("plot_price", Some(plan.plot_price)),
        ("down_payment_amount", plan.down_payment_amount),
        ("monthly_payment", Some(plan.monthly_payment)),
        ("quarterly_payment", plan.quarterly_payment),
        ("bi_yearly_payment", plan.bi_yearly_payment),
        ("triannual_payment", plan.triannual_payment),
    ];

    fields
        .into_iter()
        .filter_map(|(field, amount)| match amount {
            Some(amount) if amount.is_negative() => Some(PlanViolation::NegativeAmount {
                field: field.to_string(),
                amount,
            }),
            _ => None,
        })
        .collect()
}
