//! Database repositories for each table.

pub mod comments;
pub mod likes;
pub mod settings;

pub use comments::CommentsRepo;
pub use likes::LikesRepo;
pub use settings::SettingsRepo;
