use std::collections::HashMap;

use chrono::NaiveTime;
use tracing::warn;
use uuid::Uuid;

use crate::models::{wall_clock, CandidateSlot, PersistedSlotRow, ScheduleSlot, SlotStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub status: String,
    pub patient_id: Option<Uuid>,
}

/// Bookings for one doctor and date, keyed by `HH:MM` start time.
#[derive(Debug, Clone, Default)]
pub struct BookingMap {
    entries: HashMap<String, Booking>,
}

impl BookingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, start_time: NaiveTime, booking: Booking) -> Option<Booking> {
        self.entries.insert(wall_clock::format(start_time), booking)
    }

    pub fn get(&self, start_key: &str) -> Option<&Booking> {
        self.entries.get(start_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a PersistedSlotRow>) -> Self {
        let mut map = Self::new();
        for row in rows {
            let booking = Booking {
                status: row.status.clone(),
                patient_id: row.patient_id,
            };
            if map.insert(row.start_time, booking).is_some() {
                warn!(
                    "Duplicate booking rows for doctor {} at {} {}, keeping the last one",
                    row.doctor_id, row.slot_date, wall_clock::format(row.start_time)
                );
            }
        }
        map
    }
}

/// Interprets a booking record for `candidate`. Unknown statuses and
/// bookings without a patient come back as `Unavailable`.
pub fn interpret_booking(candidate: CandidateSlot, status: &str, patient_id: Option<Uuid>) -> ScheduleSlot {
    match SlotStatus::from_booking_status(status) {
        Some(SlotStatus::Booked) if patient_id.is_none() => {
            warn!(
                "Booking for doctor {} at {} {} has no patient, marking unavailable",
                candidate.doctor_id, candidate.slot_date, candidate.start_key()
            );
            ScheduleSlot::unavailable(candidate)
        }
        Some(status) => ScheduleSlot::with_status(candidate, status, patient_id),
        None => {
            warn!(
                "Unrecognised booking status '{}' for doctor {} at {} {}, marking unavailable",
                status, candidate.doctor_id, candidate.slot_date, candidate.start_key()
            );
            ScheduleSlot::unavailable(candidate)
        }
    }
}

pub fn resolve_status(candidate: CandidateSlot, booking: Option<&Booking>) -> ScheduleSlot {
    match booking {
        Some(booking) => interpret_booking(candidate, &booking.status, booking.patient_id),
        None => ScheduleSlot::available(candidate),
    }
}

/// Overlays `bookings` on `candidates`, keeping candidate order. Slots with no
/// booking are available.
pub fn resolve_statuses<I>(candidates: I, bookings: &BookingMap) -> Vec<ScheduleSlot>
where
    I: IntoIterator<Item = CandidateSlot>,
{
    candidates
        .into_iter()
        .map(|candidate| {
            let booking = bookings.get(&candidate.start_key());
            resolve_status(candidate, booking)
        })
        .collect()
}
