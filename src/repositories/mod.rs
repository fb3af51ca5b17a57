//! # Repository Layer
//!
//! Repositories wrap SeaORM operations for one aggregate each. Every repository holds an
//! `Arc<DatabaseConnection>`; multi-table writes that must be atomic live in the service
//! that owns the transaction instead.

pub mod api_application;
pub mod comment;
pub mod external_account;
pub mod node;
pub mod oauth_state;
pub mod sanction;
pub mod status_message;
pub mod user;

pub use api_application::ApiApplicationRepository;
pub use comment::CommentRepository;
pub use external_account::ExternalAccountRepository;
pub use node::NodeRepository;
pub use oauth_state::OAuthStateRepository;
pub use sanction::SanctionRepository;
pub use status_message::StatusMessageRepository;
pub use user::UserRepository;
