//! Riposte Storage - SQLite persistence layer.
//!
//! This crate owns every persisted byte of the comment service:
//!
//! - Comment rows, article likes, and settings overrides
//! - Versioned schema migrations
//! - The single-writer queue every mutation funnels through
//! - Compressed snapshot backups and restore
//! - Integrity health checks
//!
//! # Example
//!
//! ```no_run
//! use riposte_core::CommentStatus;
//! use riposte_storage::{Database, NewComment};
//!
//! # async fn demo() -> riposte_storage::Result<()> {
//! let db = Database::in_memory()?;
//!
//! let comment = db
//!     .insert_comment(NewComment {
//!         article_id: "hello-world".to_string(),
//!         parent_id: None,
//!         reply_to_id: None,
//!         author_name: "Ada".to_string(),
//!         author_email: "ada@example.com".to_string(),
//!         author_url: None,
//!         content: "First!".to_string(),
//!         ip: None,
//!         user_agent: None,
//!         is_admin: false,
//!         admin_id: None,
//!         status: CommentStatus::Pending,
//!     })
//!     .await?;
//!
//! db.set_status(comment.id, CommentStatus::Approved).await?;
//! # Ok(())
//! # }
//! ```

mod backup;
mod database;
pub mod error;
pub mod health;
mod ids;
pub mod models;
mod pool;
pub mod repository;
mod schema;
mod write_queue;

pub use backup::BackupManager;
pub use database::Database;
pub use error::{Result, StorageError};
pub use health::HealthReport;
pub use ids::new_public_id;
pub use models::{ArticleLikeCount, Comment, NewComment, Setting, StatusCounts};
pub use pool::ConnectionPool;
pub use write_queue::WriteQueue;
