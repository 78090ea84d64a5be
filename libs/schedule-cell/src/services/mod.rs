pub mod generator;
pub mod resolver;
pub mod policy;
pub mod store;
pub mod schedule;

pub use generator::{generate_candidate_slots, generate_for_range, CandidateSlots};
pub use resolver::{resolve_statuses, Booking, BookingMap};
pub use policy::{AlwaysAvailable, FallbackStatusPolicy, RandomizedDemo};
pub use store::{ScheduleStore, SupabaseScheduleStore};
pub use schedule::ScheduleService;
