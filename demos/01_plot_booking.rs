/// plot booking - plan check, intake, payments and reconciliation with controlled time
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use plot_plan_rs::{
    BookingIntake, EngineConfig, Event, EventStore, IntakeRequest, Money, Payment, PaymentMethod,
    PaymentReconciler, PaymentType, PlanTemplate, PlanValidator, Plot, SafeTimeProvider,
    SecondaryCadence, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== plot booking example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();
    let config = EngineConfig::default();

    // 5 marla, 20% down, monthly plus quarterly
    let plan = PlanTemplate::builder()
        .plot_size_unit(dec!(5))
        .plot_price(Money::from_major(2_500_000))
        .down_payment_percentage(dec!(20))
        .monthly_payment(Money::from_major(60_000))
        .secondary_payment(SecondaryCadence::Quarterly, Money::from_major(70_000))
        .tenure_months(24)
        .build();

    let validation = PlanValidator::new(config.clone()).validate(&plan);
    println!("plan: {}", plan.name);
    println!("  down payment:  {}", validation.totals.down_payment);
    println!("  total planned: {}", validation.totals.total_planned);
    println!("  valid:         {}", validation.is_valid());
    for message in validation.messages() {
        println!("  error: {}", message);
    }

    let request = IntakeRequest {
        customer_id: Some(Uuid::new_v4()),
        plot: Some(Plot {
            id: Uuid::new_v4(),
            price: Money::from_major(2_500_000),
            size_unit: dec!(5),
        }),
        plan: Some(plan),
        payment_type: PaymentType::Installment,
        paid_amount: Money::from_major(200_000),
        installment_count: None,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    };

    let mut events = EventStore::new();
    let admitted = match BookingIntake::new(config.clone()).admit(&request, &time, &mut events) {
        Ok(admitted) => admitted,
        Err(errors) => {
            for (field, message) in errors.field_messages() {
                println!("{:?}: {}", field, message);
            }
            return Err(errors.into());
        }
    };

    let mut booking = admitted.booking;
    let Some(schedule) = admitted.schedule else {
        return Err("installment booking without a schedule".into());
    };

    println!("\nbooking {} admitted, {} installments", booking.id, schedule.len());
    for installment in schedule.installments.iter().take(5) {
        println!(
            "  #{:<3} {:<22} {:>10} due {}",
            installment.number,
            format!("{:?}", installment.installment_type),
            installment.amount,
            installment.due_date
        );
    }

    // down payment balance, then three monthly installments and the first quarterly
    let mut payments = Vec::new();
    for (days, amount) in [(3, 300_000), (28, 60_000), (29, 60_000), (31, 60_000), (1, 70_000)] {
        controller.advance(Duration::days(days));
        let payment = Payment::completed(
            booking.id,
            Money::from_major(amount),
            time.now().date_naive(),
            PaymentMethod::BankTransfer,
        );
        booking.record_payment(&payment, &time, &mut events)?;
        payments.push(payment);
    }

    controller.advance(Duration::days(60));
    let reconciliation =
        PaymentReconciler::new(config).reconcile(&booking, &schedule, &payments, &time);

    let summary = &reconciliation.summary;
    println!("\nas of {}:", reconciliation.as_of);
    println!("  paid:        {}", summary.paid_amount);
    println!("  pending:     {}", summary.pending_amount);
    println!("  paid count:  {}", summary.installments_paid);
    println!("  overdue:     {}", summary.installments_overdue);
    println!(
        "  down payment pending: {}",
        summary.down_payment_breakdown.pending_down_payment
    );
    if let Some(next) = summary.next_due {
        println!("  next due:    #{} on {} ({})", next.installment_number, next.due_date, next.outstanding);
    }

    println!("\nevents:");
    for event in events.take_events() {
        match event {
            Event::BookingAdmitted { booking_id, .. } => println!("  booking admitted {}", booking_id),
            Event::ScheduleGenerated { installments, end_date, .. } => {
                println!("  schedule generated: {} installments until {}", installments, end_date)
            }
            Event::PlanPriceDivergence { plan_price, plot_price, .. } => {
                println!("  plan price {} differs from plot price {}", plan_price, plot_price)
            }
            Event::PaymentRecorded { amount, new_paid_amount, .. } => {
                println!("  payment {} recorded, paid {}", amount, new_paid_amount)
            }
        }
    }

    let first = schedule.require(1)?;
    println!("\nfirst installment: {:?} {} due {}", first.installment_type, first.amount, first.due_date);
    Ok(())
}
