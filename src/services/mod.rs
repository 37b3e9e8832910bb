pub mod analytics_service;
pub mod graph_service;
pub mod membership_service;
pub mod reporting_service;
pub mod story_locks;
pub mod story_service;

pub use analytics_service::*;
pub use graph_service::*;
pub use membership_service::*;
pub use reporting_service::*;
pub use story_locks::*;
pub use story_service::*;
