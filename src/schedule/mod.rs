pub mod generator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::plan::ScheduleTerms;
use crate::types::{InstallmentNumber, InstallmentType};

pub use generator::ScheduleGenerator;

/// one dated obligation; never re-dated once generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub number: InstallmentNumber,
    pub installment_type: InstallmentType,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// generated installment schedule with the frozen plan numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub terms: ScheduleTerms,
    pub required_down_payment: Money,
    pub initial_payment: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub installments: Vec<Installment>,
}

impl Schedule {
    pub fn get(&self, number: InstallmentNumber) -> Option<&Installment> {
        self.installments.iter().find(|i| i.number == number)
    }

    pub fn require(&self, number: InstallmentNumber) -> Result<&Installment> {
        self.get(number)
            .ok_or(EngineError::UnknownInstallment { number })
    }

    pub fn down_payment_balance(&self) -> Option<&Installment> {
        self.installments
            .iter()
            .find(|i| i.installment_type == InstallmentType::DownPaymentBalance)
    }

    pub fn of_type(&self, installment_type: InstallmentType) -> impl Iterator<Item = &Installment> {
        self.installments
            .iter()
            .filter(move |i| i.installment_type == installment_type)
    }

    /// sum of every scheduled amount
    pub fn total_scheduled(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }
}
