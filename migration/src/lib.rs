//! Database migrations for the OSF web API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_090000_create_users;
mod m2025_01_06_090100_create_nodes;
mod m2025_01_06_090200_create_comments;
mod m2025_01_06_090300_create_external_accounts;
mod m2025_01_06_090400_create_oauth_states;
mod m2025_01_06_090500_create_api_oauth2_applications;
mod m2025_01_06_090600_create_sanctions;
mod m2025_01_06_090700_create_status_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_090000_create_users::Migration),
            Box::new(m2025_01_06_090100_create_nodes::Migration),
            Box::new(m2025_01_06_090200_create_comments::Migration),
            Box::new(m2025_01_06_090300_create_external_accounts::Migration),
            Box::new(m2025_01_06_090400_create_oauth_states::Migration),
            Box::new(m2025_01_06_090500_create_api_oauth2_applications::Migration),
            Box::new(m2025_01_06_090600_create_sanctions::Migration),
            Box::new(m2025_01_06_090700_create_status_messages::Migration),
        ]
    }
}
