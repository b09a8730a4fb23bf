//! Data models
//!
//! Rust structs representing database entities.

mod animal;
mod daily_health_check;
mod habitat;
mod health_record;
mod vaccination;

pub use animal::{Animal, AnimalCreate, AnimalUpdate, StatusCount};
pub use daily_health_check::{DailyHealthCheck, DailyHealthCheckCreate, DailyHealthCheckDetail};
pub use habitat::{Habitat, HabitatCreate, HabitatUpdate};
pub use health_record::{HealthRecord, HealthRecordCreate, HealthRecordDetail};
pub use vaccination::{SpeciesCoverage, Vaccination, VaccinationCreate, VaccinationDetail};
