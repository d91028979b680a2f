use chrono::{Months, NaiveDate};
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::plan::validator::compute_down_payment;
use crate::plan::{PlanTemplate, ScheduleTerms};
use crate::types::InstallmentType;

use super::{Installment, Schedule};

/// turns plan terms into a dated installment schedule
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleGenerator;

impl ScheduleGenerator {
    pub fn new() -> Self {
        Self
    }

    /// generate from a stored plan template
    pub fn generate_for_plan(
        &self,
        plan: &PlanTemplate,
        start_date: NaiveDate,
        initial_payment: Money,
    ) -> Result<Schedule> {
        let terms = plan.schedule_terms()?;
        self.generate(&terms, start_date, initial_payment)
    }

    /// generate from frozen or ad-hoc terms
    pub fn generate(
        &self,
        terms: &ScheduleTerms,
        start_date: NaiveDate,
        initial_payment: Money,
    ) -> Result<Schedule> {
        let required_down_payment = compute_down_payment(terms.plot_price, terms.down_payment);
        let mut entries: Vec<(InstallmentType, Money, NaiveDate)> = Vec::new();

        if initial_payment < required_down_payment {
            entries.push((
                InstallmentType::DownPaymentBalance,
                required_down_payment - initial_payment,
                start_date,
            ));
        }

        for month in 1..=terms.tenure_months {
            entries.push((
                InstallmentType::Monthly,
                terms.monthly_payment,
                add_months(start_date, month)?,
            ));
        }

        if let Some(secondary) = terms.secondary {
            let period = secondary.cadence.period_months();
            for occurrence in 1..=secondary.cadence.occurrences(terms.tenure_months) {
                entries.push((
                    secondary.cadence.into(),
                    secondary.amount,
                    add_months(start_date, occurrence * period)?,
                ));
            }
        }

        // stable sort keeps generation order among equal keys
        entries.sort_by_key(|(kind, _, due)| (*due, kind.tie_rank()));

        let installments: Vec<Installment> = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (installment_type, amount, due_date))| Installment {
                number: idx as u32 + 1,
                installment_type,
                amount,
                due_date,
            })
            .collect();

        let end_date = installments
            .last()
            .map(|i| i.due_date)
            .unwrap_or(start_date);

        debug!(
            installments = installments.len(),
            %start_date,
            %end_date,
            required_down_payment = %required_down_payment,
            "schedule generated"
        );

        Ok(Schedule {
            terms: *terms,
            required_down_payment,
            initial_payment,
            start_date,
            end_date,
            installments,
        })
    }
}

/// calendar month offset, clamped to the last day of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or(EngineError::DateOutOfRange {
            start: date,
            months,
        })
}
