use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::listings::ListingStatus;
use crate::entities::users::UserRole;
use crate::entities::{listings, trashed_listings};

pub mod migrator;
pub mod repositories;

pub use repositories::listing::{BulkUpdateEntry, SortKey};
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // In-memory databases must stay on one connection; every pooled
        // connection would otherwise see its own empty database.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn listing_repo(&self) -> repositories::listing::ListingRepository {
        repositories::listing::ListingRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Catalog queries ==========

    pub async fn list_listings(&self, sort: SortKey) -> Result<Vec<listings::Model>> {
        self.listing_repo().list(sort).await
    }

    pub async fn get_listing(&self, id: &str) -> Result<Option<listings::Model>> {
        self.listing_repo().get(id).await
    }

    pub async fn search_listings(&self, query: &str) -> Result<Vec<listings::Model>> {
        self.listing_repo().search(query).await
    }

    // ========== Listing lifecycle ==========

    pub async fn listing_id_in_use(&self, id: &str) -> Result<bool> {
        self.listing_repo().id_in_use(id).await
    }

    pub async fn create_listing(
        &self,
        id: &str,
        name: &str,
        image: &str,
        status: ListingStatus,
    ) -> Result<Option<listings::Model>> {
        self.listing_repo().create(id, name, image, status).await
    }

    pub async fn update_listing(
        &self,
        id: &str,
        name: &str,
        status: ListingStatus,
        image: &str,
    ) -> Result<Option<listings::Model>> {
        self.listing_repo().update(id, name, status, image).await
    }

    pub async fn bulk_update_listings(&self, entries: &[BulkUpdateEntry]) -> Result<u64> {
        self.listing_repo().bulk_update(entries).await
    }

    pub async fn soft_delete_listing(&self, id: &str) -> Result<bool> {
        self.listing_repo().soft_delete(id).await
    }

    pub async fn soft_delete_all_listings(&self) -> Result<u64> {
        self.listing_repo().soft_delete_all().await
    }

    pub async fn list_trash(&self, sort: SortKey) -> Result<Vec<trashed_listings::Model>> {
        self.listing_repo().list_trash(sort).await
    }

    pub async fn restore_listing(&self, id: &str) -> Result<bool> {
        self.listing_repo().restore(id).await
    }

    pub async fn purge_listing(&self, id: &str) -> Result<Option<String>> {
        self.listing_repo().purge(id).await
    }

    pub async fn purge_all_listings(&self) -> Result<Vec<String>> {
        self.listing_repo().purge_all().await
    }

    // ========== Users ==========

    pub async fn list_users(&self, sort: SortKey) -> Result<Vec<User>> {
        self.user_repo().list(sort).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .create(username, email, password, role, config)
            .await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn remove_user(&self, id: i32) -> Result<bool> {
        self.user_repo().remove(id).await
    }

    pub async fn remove_users(&self, ids: &[i32]) -> Result<u64> {
        self.user_repo().remove_many(ids).await
    }

    pub async fn prune_inactive_users(&self) -> Result<u64> {
        self.user_repo().prune_inactive().await
    }
}
