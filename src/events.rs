use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BookingId, CustomerId, PaymentId, PaymentType, PlanId, PlotId};

/// events emitted while admitting bookings and recording payments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BookingAdmitted {
        booking_id: BookingId,
        customer_id: CustomerId,
        plot_id: PlotId,
        payment_type: PaymentType,
        total_amount: Money,
        paid_amount: Money,
        timestamp: DateTime<Utc>,
    },
    ScheduleGenerated {
        booking_id: BookingId,
        plan_id: PlanId,
        installments: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    PlanPriceDivergence {
        plan_id: PlanId,
        plot_id: PlotId,
        plan_price: Money,
        plot_price: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRecorded {
        booking_id: BookingId,
        payment_id: PaymentId,
        amount: Money,
        new_paid_amount: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
