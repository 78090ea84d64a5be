use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl FromStr for DayOfWeek {
    type Err = ScheduleError;

    /// Accepts full names and three-letter abbreviations in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DayOfWeek::ALL
            .iter()
            .copied()
            .find(|day| {
                let label = day.label().to_ascii_lowercase();
                label == needle || label[..3] == needle
            })
            .ok_or_else(|| ScheduleError::Validation(format!("Unknown weekday '{}'", s)))
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Wall-clock times are kept as minute-precision `NaiveTime` and written as
/// 24-hour `HH:MM`. Input may also be `HH:MM:SS` (Postgres `time`) or
/// 12-hour `hh:MM AM`. Postgres `24:00` maps to [`wall_clock::end_of_day`].
pub mod wall_clock {
    use chrono::{Duration, NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::error::ScheduleError;

    const ACCEPTED_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];
    const MIDNIGHT_END: [&str; 2] = ["24:00", "24:00:00"];

    /// Last representable instant of the day, written back as `24:00`.
    pub fn end_of_day() -> NaiveTime {
        NaiveTime::MIN.overflowing_sub_signed(Duration::seconds(1)).0
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, ScheduleError> {
        let trimmed = raw.trim();
        if MIDNIGHT_END.contains(&trimmed) {
            return Ok(end_of_day());
        }
        ACCEPTED_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
            .and_then(|time| NaiveTime::from_hms_opt(time.hour(), time.minute(), 0))
            .ok_or_else(|| ScheduleError::Validation(format!("Invalid wall-clock time '{}'", raw)))
    }

    pub fn format(time: NaiveTime) -> String {
        if time == end_of_day() {
            return "24:00".to_string();
        }
        time.format("%H:%M").to_string()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A doctor's recurring weekly availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityProfile {
    pub doctor_id: Uuid,
    pub days_of_week: BTreeSet<DayOfWeek>,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
}

impl AvailabilityProfile {
    pub fn new(
        doctor_id: Uuid,
        days_of_week: impl IntoIterator<Item = DayOfWeek>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, ScheduleError> {
        if start_time >= end_time {
            return Err(ScheduleError::Validation(format!(
                "Availability start {} must be before end {}",
                wall_clock::format(start_time),
                wall_clock::format(end_time)
            )));
        }

        Ok(Self {
            doctor_id,
            days_of_week: days_of_week.into_iter().collect(),
            start_time,
            end_time,
        })
    }

    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        self.days_of_week.contains(&DayOfWeek::of(date))
    }
}

/// Row shape of the `doctors` table columns the schedule reads.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityProfileRow {
    pub id: Uuid,
    #[serde(default)]
    pub available_days: Option<Vec<String>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TryFrom<AvailabilityProfileRow> for AvailabilityProfile {
    type Error = ScheduleError;

    fn try_from(row: AvailabilityProfileRow) -> Result<Self, Self::Error> {
        let days = row
            .available_days
            .unwrap_or_default()
            .iter()
            .map(|label| label.parse::<DayOfWeek>())
            .collect::<Result<Vec<_>, _>>()?;

        let (start, end) = match (row.start_time.as_deref(), row.end_time.as_deref()) {
            (Some(start), Some(end)) => (wall_clock::parse(start)?, wall_clock::parse(end)?),
            _ => {
                return Err(ScheduleError::Validation(format!(
                    "Doctor {} has no availability window",
                    row.id
                )))
            }
        };

        AvailabilityProfile::new(row.id, days, start, end)
    }
}

/// Generated, never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
}

impl CandidateSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn start_key(&self) -> String {
        wall_clock::format(self.start_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    Unavailable,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Unavailable => "unavailable",
        }
    }

    /// Maps the free-form status strings found in booking rows. `None` for
    /// anything unrecognised.
    pub fn from_booking_status(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "booked" | "confirmed" | "reserved" => Some(SlotStatus::Booked),
            "unavailable" | "blocked" => Some(SlotStatus::Unavailable),
            "available" | "free" | "open" => Some(SlotStatus::Available),
            _ => None,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved slot. `status == Booked` exactly when `patient_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSlot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub patient_id: Option<Uuid>,
    pub patient_display_name: Option<String>,
}

impl ScheduleSlot {
    pub fn available(candidate: CandidateSlot) -> Self {
        Self::from_parts(candidate, SlotStatus::Available, None)
    }

    pub fn unavailable(candidate: CandidateSlot) -> Self {
        Self::from_parts(candidate, SlotStatus::Unavailable, None)
    }

    pub fn booked(candidate: CandidateSlot, patient_id: Uuid) -> Self {
        Self::from_parts(candidate, SlotStatus::Booked, Some(patient_id))
    }

    /// Builds a slot while keeping the booked/patient invariant: a booking
    /// without a patient degrades to `Unavailable`, and a patient reference
    /// on any other status is dropped.
    pub fn with_status(candidate: CandidateSlot, status: SlotStatus, patient_id: Option<Uuid>) -> Self {
        match (status, patient_id) {
            (SlotStatus::Booked, Some(patient)) => Self::booked(candidate, patient),
            (SlotStatus::Booked, None) => Self::unavailable(candidate),
            (SlotStatus::Available, _) => Self::available(candidate),
            (SlotStatus::Unavailable, _) => Self::unavailable(candidate),
        }
    }

    fn from_parts(candidate: CandidateSlot, status: SlotStatus, patient_id: Option<Uuid>) -> Self {
        Self {
            id: None,
            doctor_id: candidate.doctor_id,
            slot_date: candidate.slot_date,
            start_time: candidate.start_time,
            end_time: candidate.end_time,
            status,
            patient_id,
            patient_display_name: None,
        }
    }

    pub fn candidate(&self) -> CandidateSlot {
        CandidateSlot {
            doctor_id: self.doctor_id,
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }

    /// The status is written in canonical form, so stored synonyms such as
    /// `confirmed` or `blocked` come back as `booked` and `unavailable`.
    pub fn to_persisted(&self) -> PersistedSlotRow {
        PersistedSlotRow {
            id: self.id,
            doctor_id: self.doctor_id,
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status.as_str().to_string(),
            patient_id: self.patient_id,
        }
    }
}

/// Row shape of the `doctor_schedules` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSlotRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub doctor_id: Uuid,
    pub slot_date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    pub status: String,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
}

impl PersistedSlotRow {
    pub fn candidate(&self) -> CandidateSlot {
        CandidateSlot {
            doctor_id: self.doctor_id,
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleQuery {
    Day(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl ScheduleQuery {
    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            ScheduleQuery::Day(date) => (date, date),
            ScheduleQuery::Range { from, to } => (from, to),
        }
    }

    /// Inclusive, chronological. Empty when `from > to`.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let (from, to) = self.bounds();
        from.iter_days().take_while(move |date| *date <= to)
    }

    pub fn len_days(&self) -> i64 {
        let (from, to) = self.bounds();
        (to - from).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    Persisted,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub source: ScheduleSource,
    pub slots: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleResult {
    pub doctor_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DaySchedule>,
}

impl ScheduleResult {
    pub fn day(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.iter().find(|day| day.date == date)
    }

    pub fn slots(&self) -> impl Iterator<Item = &ScheduleSlot> {
        self.days.iter().flat_map(|day| day.slots.iter())
    }
}
