//! HTTP request handlers for the portfolio service.

pub mod health;
pub mod metrics;
pub mod private;
pub mod readme;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use private::{download_resume, get_session};
pub use readme::get_readme;
