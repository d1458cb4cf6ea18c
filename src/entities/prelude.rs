pub use super::listings::Entity as Listings;
pub use super::trashed_listings::Entity as TrashedListings;
pub use super::users::Entity as Users;
