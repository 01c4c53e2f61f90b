/// Services layer
///
/// Pure helpers (business days, notification builders) and the adapters for
/// the profile directory, the notification store and the offer files.
pub mod business_days;
pub mod notification_builder;
pub mod notification_store;
pub mod offer_store;
pub mod profile_directory;
pub mod supabase;

pub use business_days::add_business_days;
pub use notification_store::{NotificationSink, SupabaseNotificationStore};
pub use offer_store::{FsOfferStore, OfferSource};
pub use profile_directory::{ProfileDirectory, SupabaseDirectory};
pub use supabase::SupabaseClient;
