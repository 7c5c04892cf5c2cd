pub mod kpi;
pub mod seed;
pub mod trend;
