pub mod prelude;

pub mod listings;
pub mod trashed_listings;
pub mod users;
