//! Chart data for a patient-cohort dashboard.
//!
//! ```text
//!  file ──loader──▶ Dataset ──(Selection)──▶ compute ──▶ ChartSet (8 slots)
//! ```
//!
//! [`state::DashboardState`] keeps a session's selection and current charts
//! for a presentation layer that reacts to checklist changes.

pub mod charts;
pub mod color;
pub mod data;
pub mod state;
