pub mod excel;
pub mod health_score;
pub mod incident_profile;
pub mod portfolio;
pub mod snapshot_cache;
