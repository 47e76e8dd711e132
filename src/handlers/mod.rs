pub mod home;
pub mod users;
