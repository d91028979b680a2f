pub mod validator;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::types::{PlanId, PlanStatus, SecondaryCadence};

pub use validator::{PlanTotals, PlanValidation, PlanValidator, PlanViolation};

/// how the down payment of a plan is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DownPaymentRule {
    /// absolute amount
    Amount(Money),
    /// percentage of the plot price, 0-100
    Percentage(Decimal),
    None,
}

/// one secondary cadence and its per-occurrence amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryPayment {
    pub cadence: SecondaryCadence,
    pub amount: Money,
}

impl SecondaryPayment {
    pub fn new(cadence: SecondaryCadence, amount: Money) -> Self {
        Self { cadence, amount }
    }

    /// sum of all occurrences within a tenure
    pub fn total(&self, tenure_months: u32) -> Money {
        self.amount.times(self.cadence.occurrences(tenure_months))
    }
}

/// reusable pricing template, stored with raw form fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTemplate {
    pub id: PlanId,
    pub name: String,
    pub plot_size_unit: Decimal,
    pub plot_price: Money,
    pub down_payment_amount: Option<Money>,
    pub down_payment_percentage: Option<Decimal>,
    pub monthly_payment: Money,
    pub quarterly_payment: Option<Money>,
    pub bi_yearly_payment: Option<Money>,
    pub triannual_payment: Option<Money>,
    pub tenure_months: u32,
    pub status: PlanStatus,
}

impl PlanTemplate {
    pub fn builder() -> PlanTemplateBuilder {
        PlanTemplateBuilder::new()
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// absolute amount wins when both fields carry a non-zero value
    pub fn down_payment_rule(&self) -> DownPaymentRule {
        match (self.down_payment_amount, self.down_payment_percentage) {
            (Some(amount), _) if !amount.is_zero() => DownPaymentRule::Amount(amount),
            (_, Some(pct)) if !pct.is_zero() => DownPaymentRule::Percentage(pct),
            _ => DownPaymentRule::None,
        }
    }

    /// every secondary cadence carrying a non-zero amount
    pub fn secondary_payments(&self) -> Vec<SecondaryPayment> {
        SecondaryCadence::ALL
            .iter()
            .filter_map(|&cadence| {
                self.secondary_amount(cadence)
                    .filter(|amount| !amount.is_zero())
                    .map(|amount| SecondaryPayment::new(cadence, amount))
            })
            .collect()
    }

    pub fn secondary_amount(&self, cadence: SecondaryCadence) -> Option<Money> {
        match cadence {
            SecondaryCadence::Quarterly => self.quarterly_payment,
            SecondaryCadence::BiYearly => self.bi_yearly_payment,
            SecondaryCadence::Triannual => self.triannual_payment,
        }
    }

    /// freeze the plan into the typed terms a schedule is generated from
    pub fn schedule_terms(&self) -> Result<ScheduleTerms> {
        let secondary = self.secondary_payments();
        if secondary.len() > 1 {
            return Err(EngineError::AmbiguousSecondaryCadence {
                populated: secondary.len(),
            });
        }

        Ok(ScheduleTerms {
            plot_price: self.plot_price,
            down_payment: self.down_payment_rule(),
            monthly_payment: self.monthly_payment,
            secondary: secondary.into_iter().next(),
            tenure_months: self.tenure_months,
        })
    }
}

/// plan numbers a schedule is generated from; also built ad hoc at booking time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTerms {
    pub plot_price: Money,
    pub down_payment: DownPaymentRule,
    pub monthly_payment: Money,
    pub secondary: Option<SecondaryPayment>,
    pub tenure_months: u32,
}

/// builder for plan templates
#[derive(Debug, Clone)]
pub struct PlanTemplateBuilder {
    name: Option<String>,
    plot_size_unit: Decimal,
    plot_price: Money,
    down_payment_amount: Option<Money>,
    down_payment_percentage: Option<Decimal>,
    monthly_payment: Money,
    quarterly_payment: Option<Money>,
    bi_yearly_payment: Option<Money>,
    triannual_payment: Option<Money>,
    tenure_months: u32,
    status: PlanStatus,
}

impl Default for PlanTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanTemplateBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            plot_size_unit: Decimal::ZERO,
            plot_price: Money::ZERO,
            down_payment_amount: None,
            down_payment_percentage: None,
            monthly_payment: Money::ZERO,
            quarterly_payment: None,
            bi_yearly_payment: None,
            triannual_payment: None,
            tenure_months: 0,
            status: PlanStatus::Active,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn plot_size_unit(mut self, size: Decimal) -> Self {
        self.plot_size_unit = size;
        self
    }

    pub fn plot_price(mut self, price: Money) -> Self {
        self.plot_price = price;
        self
    }

    pub fn down_payment_amount(mut self, amount: Money) -> Self {
        self.down_payment_amount = Some(amount);
        self
    }

    pub fn down_payment_percentage(mut self, percentage: Decimal) -> Self {
        self.down_payment_percentage = Some(percentage);
        self
    }

    pub fn monthly_payment(mut self, amount: Money) -> Self {
        self.monthly_payment = amount;
        self
    }

    pub fn secondary_payment(mut self, cadence: SecondaryCadence, amount: Money) -> Self {
        match cadence {
            SecondaryCadence::Quarterly => self.quarterly_payment = Some(amount),
            SecondaryCadence::BiYearly => self.bi_yearly_payment = Some(amount),
            SecondaryCadence::Triannual => self.triannual_payment = Some(amount),
        }
        self
    }

    pub fn tenure_months(mut self, months: u32) -> Self {
        self.tenure_months = months;
        self
    }

    pub fn status(mut self, status: PlanStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> PlanTemplate {
        let name = self.name.unwrap_or_else(|| {
            format!("{} marla / {} months", self.plot_size_unit, self.tenure_months)
        });

        PlanTemplate {
            id: Uuid::new_v4(),
            name,
            plot_size_unit: self.plot_size_unit,
            plot_price: self.plot_price,
            down_payment_amount: self.down_payment_amount,
            down_payment_percentage: self.down_payment_percentage,
            monthly_payment: self.monthly_payment,
            quarterly_payment: self.quarterly_payment,
            bi_yearly_payment: self.bi_yearly_payment,
            triannual_payment: self.triannual_payment,
            tenure_months: self.tenure_months,
            status: self.status,
        }
    }
}
