//! HTTP API handlers for revlens-analyzer

pub mod analysis;
pub mod feedback;
pub mod health;

pub use analysis::analysis_routes;
pub use feedback::feedback_routes;
pub use health::health_routes;
