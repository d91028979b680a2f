/// end to end: plan checks, booking intake, payment recording and reconciliation
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use plot_plan_rs::{
    BookingIntake, EngineConfig, Event, EventStore, InstallmentStatus, InstallmentType,
    IntakeRequest, LinkMethod, Money, Payment, PaymentMethod, PaymentReconciler, PaymentType,
    PlanTemplate, PlanValidator, PlanViolation, Plot, SafeTimeProvider, SecondaryCadence,
    TimeSource, Uuid,
};
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn money(amount: i64) -> Money {
    Money::from_major(amount)
}

fn five_marla_plan(monthly: i64) -> PlanTemplate {
    PlanTemplate::builder()
        .plot_size_unit(dec!(5))
        .plot_price(money(2_500_000))
        .down_payment_percentage(dec!(20))
        .monthly_payment(money(monthly))
        .tenure_months(24)
        .build()
}

fn plot(price: i64) -> Plot {
    Plot {
        id: Uuid::new_v4(),
        price: money(price),
        size_unit: dec!(5),
    }
}

#[test]
fn short_plan_is_rejected_and_rounded_plan_accepted() {
    init_tracing();
    let validator = PlanValidator::default();

    let short = validator.validate(&five_marla_plan(80_000));
    assert_eq!(short.totals.down_payment, money(500_000));
    assert_eq!(short.totals.total_monthly, money(1_920_000));
    assert_eq!(short.totals.total_planned, money(2_420_000));
    assert_eq!(short.totals.shortfall, money(80_000));
    assert_eq!(short.errors, vec![PlanViolation::Shortfall { amount: money(80_000) }]);

    let rounded = validator.validate(&five_marla_plan(83_333));
    assert_eq!(rounded.totals.total_planned, money(2_499_992));
    assert_eq!(rounded.totals.shortfall, money(8));
    assert!(rounded.is_valid());

    // no slack at all under the strict configuration
    let strict = PlanValidator::new(EngineConfig::strict()).validate(&five_marla_plan(83_333));
    assert_eq!(strict.errors, vec![PlanViolation::Shortfall { amount: money(8) }]);
}

#[test]
fn full_payment_booking_has_no_schedule() {
    init_tracing();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let mut events = EventStore::new();

    let request = IntakeRequest {
        customer_id: Some(Uuid::new_v4()),
        plot: Some(plot(1_000_000)),
        plan: None,
        payment_type: PaymentType::FullPayment,
        paid_amount: money(1_000_000),
        installment_count: None,
        start_date: date(2024, 1, 1),
    };

    let admitted = BookingIntake::default().admit(&request, &time, &mut events).unwrap();

    assert_eq!(admitted.booking.down_payment, Money::ZERO);
    assert_eq!(admitted.booking.outstanding(), Money::ZERO);
    assert!(admitted.schedule.is_none());
    assert!(matches!(events.events(), [Event::BookingAdmitted { .. }]));
}

#[test]
fn installment_booking_lifecycle() {
    init_tracing();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    ));
    let control = time.test_control().unwrap();
    let mut events = EventStore::new();

    let request = IntakeRequest {
        customer_id: Some(Uuid::new_v4()),
        plot: Some(plot(2_500_000)),
        plan: Some(five_marla_plan(83_333)),
        payment_type: PaymentType::Installment,
        paid_amount: money(200_000),
        installment_count: None,
        start_date: date(2024, 1, 1),
    };

    let admitted = BookingIntake::default().admit(&request, &time, &mut events).unwrap();
    let mut booking = admitted.booking;
    let schedule = admitted.schedule.unwrap();

    assert_eq!(booking.down_payment, money(500_000));
    assert_eq!(schedule.len(), 25);
    let balance = schedule.down_payment_balance().unwrap();
    assert_eq!(balance.number, 1);
    assert_eq!(balance.amount, money(300_000));
    assert_eq!(balance.due_date, date(2024, 1, 1));
    assert_eq!(schedule.of_type(InstallmentType::Monthly).count(), 24);
    assert_eq!(schedule.end_date, date(2026, 1, 1));

    // balance settled a few days in
    control.advance(Duration::days(4));
    let mut payments = vec![Payment::completed(
        booking.id,
        money(300_000),
        time.now().date_naive(),
        PaymentMethod::BankTransfer,
    )];
    booking.record_payment(&payments[0], &time, &mut events).unwrap();

    let reconciler = PaymentReconciler::default();
    let result = reconciler.reconcile(&booking, &schedule, &payments, &time);
    assert_eq!(result.installment(1).unwrap().status, InstallmentStatus::Paid);
    assert_eq!(result.summary.down_payment_breakdown.pending_down_payment, Money::ZERO);
    assert_eq!(result.summary.installments_overdue, 0);

    // first monthly paid, second missed
    control.advance(Duration::days(27));
    let monthly = Payment::completed(
        booking.id,
        money(83_333),
        time.now().date_naive(),
        PaymentMethod::Cash,
    )
    .with_transaction_id("RCPT-0002");
    booking.record_payment(&monthly, &time, &mut events).unwrap();
    payments.push(monthly);

    control.advance(Duration::days(44));
    let result = reconciler.reconcile(&booking, &schedule, &payments, &time);

    assert_eq!(result.as_of, date(2024, 3, 16));
    assert_eq!(result.installment(2).unwrap().status, InstallmentStatus::Paid);
    assert_eq!(result.installment(3).unwrap().status, InstallmentStatus::Overdue);
    assert_eq!(result.summary.installments_paid, 2);
    assert_eq!(result.summary.installments_overdue, 1);
    assert_eq!(result.summary.paid_amount, money(583_333));
    assert_eq!(result.summary.pending_amount, money(1_916_667));
    assert_eq!(result.total_applied(), money(383_333));
    assert_eq!(
        result.summary.down_payment_breakdown.initial_down_payment_paid,
        money(200_000)
    );

    let recorded = events
        .events()
        .iter()
        .filter(|e| matches!(e, Event::PaymentRecorded { .. }))
        .count();
    assert_eq!(recorded, 2);
}

#[test]
fn quarterly_plan_under_strict_config() {
    init_tracing();
    let config = EngineConfig::strict();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    ));

    let plan = PlanTemplate::builder()
        .plot_size_unit(dec!(5))
        .plot_price(money(2_500_000))
        .down_payment_amount(money(500_000))
        .monthly_payment(money(60_000))
        .secondary_payment(SecondaryCadence::Quarterly, money(70_000))
        .tenure_months(24)
        .build();
    assert!(PlanValidator::new(config.clone()).validate(&plan).is_valid());

    let request = IntakeRequest {
        customer_id: Some(Uuid::new_v4()),
        plot: Some(plot(2_500_000)),
        plan: Some(plan),
        payment_type: PaymentType::Installment,
        paid_amount: money(500_000),
        installment_count: None,
        start_date: date(2024, 1, 1),
    };

    let intake = BookingIntake::new(config.clone());
    let admitted = intake.admit(&request, &time, &mut EventStore::new()).unwrap();
    let mut booking = admitted.booking;
    let schedule = admitted.schedule.unwrap();

    assert!(admitted.warnings.is_empty());
    assert_eq!(schedule.len(), 32);
    assert!(schedule.down_payment_balance().is_none());
    assert_eq!(schedule.total_scheduled(), money(2_000_000));
    // month three: monthly before quarterly
    assert_eq!(schedule.get(3).unwrap().installment_type, InstallmentType::Monthly);
    assert_eq!(schedule.get(4).unwrap().installment_type, InstallmentType::Quarterly);
    assert_eq!(schedule.get(4).unwrap().due_date, date(2024, 4, 1));

    let payments: Vec<Payment> = [
        (60_000, date(2024, 2, 1)),
        (60_000, date(2024, 3, 1)),
        (60_000, date(2024, 4, 1)),
        (70_000, date(2024, 4, 1)),
        (60_000, date(2024, 5, 1)),
    ]
    .into_iter()
    .map(|(amount, on)| {
        booking.paid_amount += money(amount);
        Payment::completed(booking.id, money(amount), on, PaymentMethod::Online)
    })
    .collect();

    let result = PaymentReconciler::new(config).reconcile(&booking, &schedule, &payments, &time);

    let linked: Vec<u32> = result.links.iter().map(|l| l.installment_number).collect();
    assert_eq!(linked, vec![1, 2, 3, 4, 5]);
    assert!(result.links.iter().all(|l| l.method == LinkMethod::Inferred));
    assert!(result.unlinked.is_empty());

    assert_eq!(result.summary.installments_paid, 5);
    // june first is due today, not yet overdue
    assert_eq!(result.installment(6).unwrap().status, InstallmentStatus::Pending);
    assert_eq!(result.summary.installments_overdue, 0);
    assert_eq!(result.summary.down_payment_breakdown.pending_down_payment, Money::ZERO);
}

#[test]
fn config_from_json() {
    let config = EngineConfig::from_json(r#"{ "link_tolerance": "5000" }"#).unwrap();
    assert_eq!(config.link_tolerance, money(5_000));
    assert_eq!(config.shortfall_tolerance, money(1_000));

    assert!(EngineConfig::from_json(r#"{ "max_tenure_months": 0 }"#).is_err());
    assert!(EngineConfig::from_json("not json").is_err());
}
