pub mod ids;
pub mod listing;
pub mod profile;
pub mod reputation;

pub use ids::{IdError, ListingId, SellerId, UserId};
pub use listing::{FavoriteMark, Listing, ListingStatus};
pub use profile::{UserProfile, UNKNOWN_DISPLAY_NAME};
pub use reputation::{CharmTemperature, ScoreReport, ScoreSource, BASE_SCORE, INCREMENT};
