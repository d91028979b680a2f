use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::schedule::Installment;
use crate::types::{InstallmentNumber, InstallmentType, PaymentId};

use super::Payment;

/// how a payment was attributed to an installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    /// payment carried the installment number
    Explicit,
    /// matched by amount within tolerance
    Inferred,
}

/// one row of the payment to installment link table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub payment_id: PaymentId,
    pub installment_number: InstallmentNumber,
    pub applied: Money,
    /// part of the payment beyond what the installment still owed
    pub excess: Money,
    pub method: LinkMethod,
}

/// index of the installment a payment most plausibly settles.
///
/// Candidates are unpaid installments whose amount lies within `tolerance`
/// of the payment. The closest amount wins; among equally close candidates an
/// installment of the type hinted by the payment notes wins, then the earliest
/// in schedule order.
pub fn infer_installment(
    payment: &Payment,
    installments: &[Installment],
    paid: &[Money],
    tolerance: Money,
) -> Option<usize> {
    let hint = payment
        .indicates_down_payment()
        .then_some(InstallmentType::DownPaymentBalance);

    installments
        .iter()
        .zip(paid)
        .enumerate()
        .filter(|(_, (inst, paid))| **paid < inst.amount)
        .map(|(idx, (inst, _))| (idx, inst, (inst.amount - payment.amount).abs()))
        .filter(|(_, _, distance)| *distance <= tolerance)
        .min_by_key(|(idx, inst, distance)| {
            let mismatch = hint.map_or(false, |t| t != inst.installment_type);
            (*distance, mismatch, *idx)
        })
        .map(|(idx, _, _)| idx)
}
