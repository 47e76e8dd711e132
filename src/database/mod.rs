pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{NewUser, User, UserPatch};
pub use repository::{MemoryUserRepository, PgUserRepository, UserRepository};
