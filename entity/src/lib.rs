use uuid::Uuid;

pub mod notifications;
pub mod pages;
pub mod roles;
pub mod transcriptions;
pub mod users;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
