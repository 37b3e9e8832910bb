pub mod stories;
pub mod scenes;
pub mod choices;
pub mod story_members;
pub mod characters;
pub mod assets;
pub mod documents;
pub mod analytics_events;
pub mod choice_analytics;

pub use stories::*;
pub use scenes::*;
pub use choices::*;
pub use story_members::*;
pub use characters::*;
pub use assets::*;
pub use documents::*;
pub use analytics_events::*;
pub use choice_analytics::*;
