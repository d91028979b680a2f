use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::booking::Booking;
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::schedule::{Installment, Schedule};
use crate::types::{InstallmentNumber, InstallmentStatus, InstallmentType, PaymentId};

use super::linking::{infer_installment, LinkMethod, PaymentLink};
use super::Payment;

/// installment with payments applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledInstallment {
    #[serde(flatten)]
    pub installment: Installment,
    pub paid_amount: Money,
    /// date of the payment that completed the installment; stays `None` for
    /// zero-amount installments, which are settled without any payment
    pub paid_date: Option<NaiveDate>,
    pub status: InstallmentStatus,
}

impl ReconciledInstallment {
    pub fn outstanding(&self) -> Money {
        self.installment.amount.saturating_sub(self.paid_amount)
    }
}

/// down payment split between intake and the balance installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownPaymentBreakdown {
    pub required_down_payment: Money,
    pub initial_down_payment_paid: Money,
    pub remaining_down_payment_required: Money,
    pub remaining_down_payment_paid: Money,
    pub pending_down_payment: Money,
}

/// earliest installment still owing money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextDue {
    pub installment_number: InstallmentNumber,
    pub due_date: NaiveDate,
    pub outstanding: Money,
}

/// booking level figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub total_amount: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,
    pub down_payment_breakdown: DownPaymentBreakdown,
    pub installments_paid: usize,
    pub installments_partial: usize,
    pub installments_overdue: usize,
    pub next_due: Option<NextDue>,
    pub unlinked_payments: usize,
}

/// result of reconciling a booking's payments against its schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub as_of: NaiveDate,
    pub installments: Vec<ReconciledInstallment>,
    pub links: Vec<PaymentLink>,
    pub unlinked: Vec<PaymentId>,
    pub summary: BookingSummary,
}

impl Reconciliation {
    pub fn installment(&self, number: InstallmentNumber) -> Option<&ReconciledInstallment> {
        self.installments
            .iter()
            .find(|i| i.installment.number == number)
    }

    /// sum of amounts applied to installments; may trail the booking paid amount
    pub fn total_applied(&self) -> Money {
        self.installments.iter().map(|i| i.paid_amount).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// payment reconciler
#[derive(Debug, Clone, Default)]
pub struct PaymentReconciler {
    config: EngineConfig,
}

impl PaymentReconciler {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// reconcile as of the provider's current date
    pub fn reconcile(
        &self,
        booking: &Booking,
        schedule: &Schedule,
        payments: &[Payment],
        time_provider: &SafeTimeProvider,
    ) -> Reconciliation {
        self.reconcile_on(booking, schedule, payments, time_provider.now().date_naive())
    }

    /// reconcile as of an explicit date
    pub fn reconcile_on(
        &self,
        booking: &Booking,
        schedule: &Schedule,
        payments: &[Payment],
        today: NaiveDate,
    ) -> Reconciliation {
        let installments = &schedule.installments;
        let mut paid = vec![Money::ZERO; installments.len()];
        let mut paid_dates: Vec<Option<NaiveDate>> = vec![None; installments.len()];
        let mut links = Vec::new();
        let mut unlinked = Vec::new();

        let (mut participating, non_positive): (Vec<&Payment>, Vec<&Payment>) = payments
            .iter()
            .filter(|p| p.is_completed() && p.booking_id == booking.id)
            .partition(|p| p.amount.is_positive());

        for payment in &non_positive {
            warn!(
                payment = %payment.id,
                amount = %payment.amount,
                "non-positive payment excluded from reconciliation"
            );
            unlinked.push(payment.id);
        }

        // stable: equal dates keep recording order
        participating.sort_by_key(|p| p.payment_date);

        for payment in &participating {
            let target = match payment.installment_number {
                Some(number) => {
                    let idx = installments.iter().position(|i| i.number == number);
                    if idx.is_none() {
                        warn!(
                            payment = %payment.id,
                            installment = number,
                            "payment linked to an installment outside the schedule"
                        );
                    }
                    idx.map(|idx| (idx, LinkMethod::Explicit))
                }
                None => infer_installment(payment, installments, &paid, self.config.link_tolerance)
                    .map(|idx| (idx, LinkMethod::Inferred)),
            };

            let Some((idx, method)) = target else {
                debug!(payment = %payment.id, amount = %payment.amount, "payment left unlinked");
                unlinked.push(payment.id);
                continue;
            };

            let installment = &installments[idx];
            let applied = payment.amount.min(installment.amount.saturating_sub(paid[idx]));
            paid[idx] += applied;
            if paid_dates[idx].is_none() && paid[idx] >= installment.amount {
                paid_dates[idx] = Some(payment.payment_date);
            }

            links.push(PaymentLink {
                payment_id: payment.id,
                installment_number: installment.number,
                applied,
                excess: payment.amount - applied,
                method,
            });
        }

        if !unlinked.is_empty() {
            warn!(
                booking = %booking.id,
                unlinked = unlinked.len(),
                "payments could not be linked to any installment"
            );
        }

        let reconciled: Vec<ReconciledInstallment> = installments
            .iter()
            .zip(paid)
            .zip(paid_dates)
            .map(|((installment, paid_amount), paid_date)| ReconciledInstallment {
                status: InstallmentStatus::derive(
                    installment.amount,
                    paid_amount,
                    installment.due_date,
                    today,
                ),
                installment: installment.clone(),
                paid_amount,
                paid_date,
            })
            .collect();

        let breakdown = down_payment_breakdown(booking, schedule, &reconciled, &participating, &links);
        let summary = summarize(booking, &reconciled, breakdown, unlinked.len());

        Reconciliation {
            as_of: today,
            installments: reconciled,
            links,
            unlinked,
            summary,
        }
    }
}

fn down_payment_breakdown(
    booking: &Booking,
    schedule: &Schedule,
    reconciled: &[ReconciledInstallment],
    participating: &[&Payment],
    links: &[PaymentLink],
) -> DownPaymentBreakdown {
    let required_down_payment = schedule.required_down_payment;

    let balance = reconciled
        .iter()
        .find(|i| i.installment.installment_type == InstallmentType::DownPaymentBalance);

    let settles_balance = |payment: &Payment| {
        payment.indicates_down_payment()
            || balance.map_or(false, |b| {
                links.iter().any(|l| {
                    l.payment_id == payment.id && l.installment_number == b.installment.number
                })
            })
    };

    let (balance_paid, other_paid) = participating.iter().fold(
        (Money::ZERO, Money::ZERO),
        |(balance_paid, other_paid), payment| {
            if settles_balance(*payment) {
                (balance_paid + payment.amount, other_paid)
            } else {
                (balance_paid, other_paid + payment.amount)
            }
        },
    );

    // booking.paid_amount also carries later cadence payments
    let initial_down_payment_paid = booking
        .paid_amount
        .saturating_sub(balance_paid)
        .saturating_sub(other_paid);

    let remaining_down_payment_required = balance
        .map(|i| i.installment.amount)
        .unwrap_or(Money::ZERO);

    let remaining_down_payment_paid = match balance {
        Some(i) if i.status.is_settled() => remaining_down_payment_required,
        _ => Money::ZERO,
    };

    debug!(
        booking = %booking.id,
        balance_paid = %balance_paid,
        initial = %initial_down_payment_paid,
        "down payment breakdown"
    );

    DownPaymentBreakdown {
        required_down_payment,
        initial_down_payment_paid,
        remaining_down_payment_required,
        remaining_down_payment_paid,
        pending_down_payment: required_down_payment
            .saturating_sub(initial_down_payment_paid + remaining_down_payment_paid),
    }
}

fn summarize(
    booking: &Booking,
    reconciled: &[ReconciledInstallment],
    down_payment_breakdown: DownPaymentBreakdown,
    unlinked_payments: usize,
) -> BookingSummary {
    let count = |status: InstallmentStatus| reconciled.iter().filter(|i| i.status == status).count();

    let next_due = reconciled
        .iter()
        .find(|i| !i.status.is_settled())
        .map(|i| NextDue {
            installment_number: i.installment.number,
            due_date: i.installment.due_date,
            outstanding: i.outstanding(),
        });

    BookingSummary {
        total_amount: booking.total_amount,
        paid_amount: booking.paid_amount,
        pending_amount: booking.total_amount.saturating_sub(booking.paid_amount),
        down_payment_breakdown,
        installments_paid: count(InstallmentStatus::Paid),
        installments_partial: count(InstallmentStatus::Partial),
        installments_overdue: count(InstallmentStatus::Overdue),
        next_due,
        unlinked_payments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanTemplate;
    use crate::schedule::ScheduleGenerator;
    use crate::types::{PaymentMethod, PaymentStatus, PaymentType};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(amount: i64) -> Money {
        Money::from_major(amount)
    }

    /// 2.5M plot, 20% down, 24 x 83,333, 200k paid at intake
    fn setup() -> (Booking, Schedule) {
        let plan = PlanTemplate::builder()
            .plot_size_unit(dec!(5))
            .plot_price(money(2_500_000))
            .down_payment_percentage(dec!(20))
            .monthly_payment(money(83_333))
            .tenure_months(24)
            .build();

        let schedule = ScheduleGenerator::new()
            .generate_for_plan(&plan, date(2024, 1, 1), money(200_000))
            .unwrap();

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            plot_id: Uuid::new_v4(),
            plan_id: Some(plan.id),
            total_amount: money(2_500_000),
            payment_type: PaymentType::Installment,
            down_payment: money(500_000),
            paid_amount: money(200_000),
            installment_count: 24,
            start_date: date(2024, 1, 1),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        (booking, schedule)
    }

    /// records the payment on the booking and returns it
    fn pay(booking: &mut Booking, amount: i64, on: NaiveDate) -> Payment {
        booking.paid_amount += money(amount);
        Payment::completed(booking.id, money(amount), on, PaymentMethod::BankTransfer)
    }

    #[test]
    fn test_balance_payment_clears_down_payment() {
        let (mut booking, schedule) = setup();
        let payments = vec![pay(&mut booking, 300_000, date(2024, 1, 5))];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 1, 10),
        );

        let balance = result.installment(1).unwrap();
        assert_eq!(balance.installment.installment_type, InstallmentType::DownPaymentBalance);
        assert_eq!(balance.status, InstallmentStatus::Paid);
        assert_eq!(balance.paid_date, Some(date(2024, 1, 5)));

        let breakdown = result.summary.down_payment_breakdown;
        assert_eq!(breakdown.required_down_payment, money(500_000));
        assert_eq!(breakdown.initial_down_payment_paid, money(200_000));
        assert_eq!(breakdown.remaining_down_payment_required, money(300_000));
        assert_eq!(breakdown.remaining_down_payment_paid, money(300_000));
        assert_eq!(breakdown.pending_down_payment, Money::ZERO);

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].method, LinkMethod::Inferred);
        assert_eq!(
            result.summary.next_due.map(|n| n.installment_number),
            Some(2)
        );
    }

    #[test]
    fn test_statuses_as_of_date() {
        let (mut booking, schedule) = setup();
        let payments = vec![
            pay(&mut booking, 300_000, date(2024, 1, 5)),
            pay(&mut booking, 83_333, date(2024, 2, 1)),
            pay(&mut booking, 40_000, date(2024, 3, 10)).linked_to(3),
        ];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 4, 15),
        );

        assert_eq!(result.installment(2).unwrap().status, InstallmentStatus::Paid);
        let partial = result.installment(3).unwrap();
        // past due but partially paid
        assert_eq!(partial.status, InstallmentStatus::Partial);
        assert_eq!(partial.paid_date, None);
        assert_eq!(partial.outstanding(), money(43_333));
        assert_eq!(result.installment(4).unwrap().status, InstallmentStatus::Overdue);
        assert_eq!(result.installment(5).unwrap().status, InstallmentStatus::Pending);

        let summary = &result.summary;
        assert_eq!(summary.installments_paid, 2);
        assert_eq!(summary.installments_partial, 1);
        assert_eq!(summary.installments_overdue, 1);
        assert_eq!(summary.paid_amount, money(623_333));
        assert_eq!(summary.pending_amount, money(1_876_667));
        assert_eq!(
            summary.next_due,
            Some(NextDue {
                installment_number: 3,
                due_date: date(2024, 3, 1),
                outstanding: money(43_333),
            })
        );

        let breakdown = summary.down_payment_breakdown;
        assert_eq!(breakdown.initial_down_payment_paid, money(200_000));
        assert_eq!(breakdown.pending_down_payment, Money::ZERO);
        assert_eq!(
            breakdown.pending_down_payment,
            breakdown.required_down_payment.saturating_sub(
                breakdown.initial_down_payment_paid + breakdown.remaining_down_payment_paid
            )
        );
    }

    #[test]
    fn test_unmatched_payments_stay_unlinked() {
        let (mut booking, schedule) = setup();
        let odd = pay(&mut booking, 50_000, date(2024, 2, 3));
        let bad_link = pay(&mut booking, 83_333, date(2024, 2, 4)).linked_to(999);
        let payments = vec![odd.clone(), bad_link.clone()];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 2, 10),
        );

        assert_eq!(result.unlinked, vec![odd.id, bad_link.id]);
        assert_eq!(result.summary.unlinked_payments, 2);
        assert!(result.links.is_empty());
        assert_eq!(result.total_applied(), Money::ZERO);
        assert!(result.total_applied() < result.summary.paid_amount);
    }

    #[test]
    fn test_only_completed_own_payments_participate() {
        let (booking, schedule) = setup();
        let payments = vec![
            Payment::completed(booking.id, money(300_000), date(2024, 1, 5), PaymentMethod::Cash)
                .with_status(PaymentStatus::Pending),
            Payment::completed(booking.id, money(300_000), date(2024, 1, 6), PaymentMethod::Cash)
                .with_status(PaymentStatus::Failed),
            Payment::completed(Uuid::new_v4(), money(300_000), date(2024, 1, 7), PaymentMethod::Cash),
        ];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 1, 10),
        );

        assert_eq!(result.total_applied(), Money::ZERO);
        assert!(result.unlinked.is_empty());
        assert_eq!(result.installment(1).unwrap().status, InstallmentStatus::Pending);

        let breakdown = result.summary.down_payment_breakdown;
        assert_eq!(breakdown.initial_down_payment_paid, money(200_000));
        assert_eq!(breakdown.remaining_down_payment_paid, Money::ZERO);
        assert_eq!(breakdown.pending_down_payment, money(300_000));
    }

    #[test]
    fn test_explicit_link_caps_at_installment_amount() {
        let (mut booking, schedule) = setup();
        let payments = vec![pay(&mut booking, 90_000, date(2024, 2, 1)).linked_to(2)];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 2, 1),
        );

        let link = &result.links[0];
        assert_eq!(link.method, LinkMethod::Explicit);
        assert_eq!(link.installment_number, 2);
        assert_eq!(link.applied, money(83_333));
        assert_eq!(link.excess, money(6_667));
        assert_eq!(result.installment(2).unwrap().paid_amount, money(83_333));
    }

    #[test]
    fn test_non_positive_payments_are_excluded() {
        let (mut booking, schedule) = setup();
        let monthly = pay(&mut booking, 83_333, date(2024, 2, 1)).linked_to(2);
        let reversal = Payment::completed(
            booking.id,
            money(-83_333),
            date(2024, 2, 5),
            PaymentMethod::BankTransfer,
        )
        .linked_to(2);
        let empty = Payment::completed(booking.id, Money::ZERO, date(2024, 2, 6), PaymentMethod::Cash);
        let payments = vec![monthly, reversal.clone(), empty.clone()];

        let result = PaymentReconciler::default().reconcile_on(
            &booking,
            &schedule,
            &payments,
            date(2024, 2, 10),
        );

        let second = result.installment(2).unwrap();
        assert_eq!(second.paid_amount, money(83_333));
        assert_eq!(second.status, InstallmentStatus::Paid);
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.unlinked, vec![reversal.id, empty.id]);
        assert_eq!(result.summary.unlinked_payments, 2);
        assert_eq!(
            result.summary.down_payment_breakdown.initial_down_payment_paid,
            money(200_000)
        );
    }

    #[test]
    fn test_zero_amount_installment_settled_without_date() {
        let plan = PlanTemplate::builder()
            .plot_size_unit(dec!(5))
            .plot_price(money(1_000_000))
            .down_payment_amount(money(1_000_000))
            .monthly_payment(Money::ZERO)
            .tenure_months(2)
            .build();
        let schedule = ScheduleGenerator::new()
            .generate_for_plan(&plan, date(2024, 1, 1), money(1_000_000))
            .unwrap();
        let (mut booking, _) = setup();
        booking.total_amount = money(1_000_000);
        booking.paid_amount = money(1_000_000);

        let result = PaymentReconciler::default().reconcile_on(&booking, &schedule, &[], date(2024, 6, 1));

        assert_eq!(result.installments.len(), 2);
        for installment in &result.installments {
            assert_eq!(installment.status, InstallmentStatus::Paid);
            assert_eq!(installment.paid_date, None);
        }
        assert_eq!(result.summary.installments_overdue, 0);
        assert_eq!(result.summary.next_due, None);
    }

    #[test]
    fn test_later_payments_never_reduce_paid_amounts() {
        let (mut booking, schedule) = setup();
        let mut payments = vec![
            pay(&mut booking, 300_000, date(2024, 1, 5)),
            pay(&mut booking, 83_333, date(2024, 2, 1)),
        ];
        let reconciler = PaymentReconciler::default();
        let before = reconciler.reconcile_on(&booking, &schedule, &payments, date(2024, 3, 15));

        payments.push(pay(&mut booking, 83_333, date(2024, 3, 2)));
        payments.push(pay(&mut booking, 60_000, date(2024, 3, 20)).linked_to(4));
        let after = reconciler.reconcile_on(&booking, &schedule, &payments, date(2024, 3, 15));

        for (old, new) in before.installments.iter().zip(&after.installments) {
            assert!(new.paid_amount >= old.paid_amount);
        }
        assert_eq!(after.installment(3).unwrap().status, InstallmentStatus::Paid);
        assert_eq!(after.installment(4).unwrap().paid_amount, money(60_000));
    }

    #[test]
    fn test_reconcile_reads_provider_date() {
        let (mut booking, schedule) = setup();
        let payments = vec![pay(&mut booking, 300_000, date(2024, 1, 5))];
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
        ));

        let reconciler = PaymentReconciler::default();
        let result = reconciler.reconcile(&booking, &schedule, &payments, &time);

        assert_eq!(result.as_of, date(2024, 3, 15));
        assert_eq!(result, reconciler.reconcile_on(&booking, &schedule, &payments, date(2024, 3, 15)));
        assert_eq!(result.summary.installments_overdue, 2);
    }

    #[test]
    fn test_reconciliation_json() {
        let (mut booking, schedule) = setup();
        let payments = vec![pay(&mut booking, 300_000, date(2024, 1, 5))];

        let json = PaymentReconciler::default()
            .reconcile_on(&booking, &schedule, &payments, date(2024, 1, 10))
            .to_json_pretty()
            .unwrap();

        assert!(json.contains("\"installment_type\": \"down_payment_balance\""));
        assert!(json.contains("\"status\": \"paid\""));
        assert!(json.contains("\"pending_down_payment\""));
    }
}
