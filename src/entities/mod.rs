pub mod prelude;

pub mod esps;
pub mod events;
pub mod sessions;
pub mod users;
