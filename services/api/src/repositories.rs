//! Repositories for database operations

pub mod gallery;
pub mod trophy;
pub mod user;

pub use gallery::GalleryRepository;
pub use trophy::TrophyRepository;
pub use user::UserRepository;

/// Postgres unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
