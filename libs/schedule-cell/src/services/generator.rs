use std::iter::FusedIterator;

use chrono::{Duration, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::{AvailabilityProfile, CandidateSlot};

pub const SLOT_LENGTH_MINUTES: i64 = 60;

/// Lazy one-hour tiling of a single day's availability window. The final
/// slot is clamped to the window end and may be shorter than an hour.
#[derive(Debug, Clone)]
pub struct CandidateSlots {
    doctor_id: Uuid,
    date: NaiveDate,
    next_start: Option<NaiveTime>,
    window_end: NaiveTime,
}

impl CandidateSlots {
    fn empty(doctor_id: Uuid, date: NaiveDate) -> Self {
        Self {
            doctor_id,
            date,
            next_start: None,
            window_end: NaiveTime::MIN,
        }
    }
}

impl Iterator for CandidateSlots {
    type Item = CandidateSlot;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        if start >= self.window_end {
            self.next_start = None;
            return None;
        }

        let (advanced, wrapped_secs) = start.overflowing_add_signed(Duration::minutes(SLOT_LENGTH_MINUTES));
        // past midnight the window has necessarily ended
        let end = if wrapped_secs != 0 || advanced > self.window_end {
            self.window_end
        } else {
            advanced
        };
        self.next_start = if wrapped_secs != 0 { None } else { Some(advanced) };

        Some(CandidateSlot {
            doctor_id: self.doctor_id,
            slot_date: self.date,
            start_time: start,
            end_time: end,
        })
    }
}

impl FusedIterator for CandidateSlots {}

/// Candidate slots for `date`, chronological. Empty when the doctor does not
/// work that weekday.
pub fn generate_candidate_slots(profile: &AvailabilityProfile, date: NaiveDate) -> CandidateSlots {
    if !profile.is_available_on(date) {
        return CandidateSlots::empty(profile.doctor_id, date);
    }

    CandidateSlots {
        doctor_id: profile.doctor_id,
        date,
        next_start: Some(profile.start_time),
        window_end: profile.end_time,
    }
}

pub fn generate_for_range(profile: &AvailabilityProfile, from: NaiveDate, to: NaiveDate) -> Vec<CandidateSlot> {
    from.iter_days()
        .take_while(|date| *date <= to)
        .flat_map(|date| generate_candidate_slots(profile, date))
        .collect()
}
