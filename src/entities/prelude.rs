pub use super::esps::Entity as Esps;
pub use super::events::Entity as Events;
pub use super::sessions::Entity as Sessions;
pub use super::users::Entity as Users;
