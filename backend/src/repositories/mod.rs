pub mod application_repository;
pub mod user_repository;

pub use application_repository::{ApplicationRepository, ApplicationRepositoryTrait};
pub use user_repository::{UserRepository, UserRepositoryTrait};

#[cfg(test)]
pub use application_repository::MockApplicationRepositoryTrait;
#[cfg(test)]
pub use user_repository::MockUserRepositoryTrait;
