use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use crate::entities::listings::ListingStatus;
use crate::entities::{listings, prelude::*, trashed_listings};

/// Sort order for catalog queries. Anything unrecognized falls back to
/// name ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Newest,
    Oldest,
    #[default]
    NameAsc,
    NameDesc,
}

impl SortKey {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("newest") => Self::Newest,
            Some("oldest") => Self::Oldest,
            Some("z-a") => Self::NameDesc,
            _ => Self::NameAsc,
        }
    }
}

/// One entry of a bulk update batch.
#[derive(Debug, Clone)]
pub struct BulkUpdateEntry {
    pub id: String,
    pub name: String,
    pub status: ListingStatus,
}

pub struct ListingRepository {
    conn: DatabaseConnection,
}

impl ListingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, sort: SortKey) -> Result<Vec<listings::Model>> {
        let query = Listings::find();
        let query = match sort {
            SortKey::Newest => query.order_by_desc(listings::Column::CreatedAt),
            SortKey::Oldest => query.order_by_asc(listings::Column::CreatedAt),
            SortKey::NameAsc => query.order_by_asc(listings::Column::Name),
            SortKey::NameDesc => query.order_by_desc(listings::Column::Name),
        };

        query.all(&self.conn).await.context("Failed to list listings")
    }

    pub async fn get(&self, id: &str) -> Result<Option<listings::Model>> {
        Listings::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query listing")
    }

    /// True when the id names an active or a trashed listing. An identity
    /// lives in at most one of the two sets; a trashed id stays reserved
    /// until it is restored or purged.
    pub async fn id_in_use(&self, id: &str) -> Result<bool> {
        if Listings::find_by_id(id).one(&self.conn).await?.is_some() {
            return Ok(true);
        }

        Ok(TrashedListings::find_by_id(id)
            .one(&self.conn)
            .await?
            .is_some())
    }

    /// Insert a new active listing. Returns `None` when the id is already
    /// taken by an active or trashed listing; a trashed id must never be
    /// shadowed by a fresh row.
    pub async fn create(
        &self,
        id: &str,
        name: &str,
        image: &str,
        status: ListingStatus,
    ) -> Result<Option<listings::Model>> {
        let txn = self.conn.begin().await?;

        let taken = Listings::find_by_id(id).one(&txn).await?.is_some()
            || TrashedListings::find_by_id(id).one(&txn).await?.is_some();
        if taken {
            return Ok(None);
        }

        let now = chrono::Utc::now().to_rfc3339();

        let model = listings::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            image: Set(image.to_string()),
            status: Set(status),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .context("Failed to insert listing")?;

        txn.commit().await.context("Failed to commit listing insert")?;

        info!("Added listing: {} ({})", model.name, model.id);
        Ok(Some(model))
    }

    /// Update name, status and image reference of one active listing.
    /// Returns `None` when the id is not in the active set.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        status: ListingStatus,
        image: &str,
    ) -> Result<Option<listings::Model>> {
        let Some(model) = Listings::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: listings::ActiveModel = model.into();
        active.name = Set(name.to_string());
        active.status = Set(status);
        active.image = Set(image.to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update listing")?;

        Ok(Some(updated))
    }

    /// Apply a batch of name/status updates as one transaction. Entries
    /// pointing at unknown ids are silent no-ops; any failure rolls the
    /// whole batch back.
    pub async fn bulk_update(&self, entries: &[BulkUpdateEntry]) -> Result<u64> {
        let txn = self.conn.begin().await?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut applied = 0u64;

        for entry in entries {
            let Some(model) = Listings::find_by_id(&entry.id).one(&txn).await? else {
                continue;
            };

            let mut active: listings::ActiveModel = model.into();
            active.name = Set(entry.name.clone());
            active.status = Set(entry.status);
            active.updated_at = Set(now.clone());
            active.update(&txn).await?;
            applied += 1;
        }

        txn.commit().await.context("Failed to commit bulk update")?;
        Ok(applied)
    }

    /// Move one listing from the active set to the trash. The copy and the
    /// delete run in a single transaction so the row can never end up in
    /// both sets or in neither. Returns `false` when the id is not active.
    pub async fn soft_delete(&self, id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(listing) = Listings::find_by_id(id).one(&txn).await? else {
            return Ok(false);
        };

        let listing_id = listing.id.clone();

        trashed_listings::ActiveModel {
            id: Set(listing.id),
            name: Set(listing.name),
            image: Set(listing.image),
            status: Set(listing.status),
            created_at: Set(listing.created_at),
            updated_at: Set(listing.updated_at),
            deleted_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&txn)
        .await?;

        Listings::delete_by_id(&listing_id).exec(&txn).await?;

        txn.commit().await.context("Failed to commit soft delete")?;

        info!("Moved listing {} to trash", listing_id);
        Ok(true)
    }

    /// Move every active listing to the trash, all-or-nothing.
    pub async fn soft_delete_all(&self) -> Result<u64> {
        let txn = self.conn.begin().await?;

        let active = Listings::find().all(&txn).await?;
        if active.is_empty() {
            return Ok(0);
        }

        let deleted_at = chrono::Utc::now().to_rfc3339();
        let count = active.len() as u64;

        let trashed: Vec<trashed_listings::ActiveModel> = active
            .into_iter()
            .map(|listing| trashed_listings::ActiveModel {
                id: Set(listing.id),
                name: Set(listing.name),
                image: Set(listing.image),
                status: Set(listing.status),
                created_at: Set(listing.created_at),
                updated_at: Set(listing.updated_at),
                deleted_at: Set(deleted_at.clone()),
            })
            .collect();

        TrashedListings::insert_many(trashed).exec(&txn).await?;
        Listings::delete_many().exec(&txn).await?;

        txn.commit()
            .await
            .context("Failed to commit bulk soft delete")?;

        info!("Moved {} listings to trash", count);
        Ok(count)
    }

    /// Trash contents. Newest/oldest order by deletion time here, so the
    /// default shows the most recently deleted first.
    pub async fn list_trash(&self, sort: SortKey) -> Result<Vec<trashed_listings::Model>> {
        let query = TrashedListings::find();
        let query = match sort {
            SortKey::Newest => query.order_by_desc(trashed_listings::Column::DeletedAt),
            SortKey::Oldest => query.order_by_asc(trashed_listings::Column::DeletedAt),
            SortKey::NameAsc => query.order_by_asc(trashed_listings::Column::Name),
            SortKey::NameDesc => query.order_by_desc(trashed_listings::Column::Name),
        };

        query.all(&self.conn).await.context("Failed to list trash")
    }

    /// Recreate the active row from a trashed one, preserving the original
    /// created/updated timestamps, and drop the trashed row. One transaction.
    /// Returns `false` when the id is not in the trash.
    pub async fn restore(&self, id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        let Some(trashed) = TrashedListings::find_by_id(id).one(&txn).await? else {
            return Ok(false);
        };

        let listing_id = trashed.id.clone();

        listings::ActiveModel {
            id: Set(trashed.id),
            name: Set(trashed.name),
            image: Set(trashed.image),
            status: Set(trashed.status),
            created_at: Set(trashed.created_at),
            updated_at: Set(trashed.updated_at),
        }
        .insert(&txn)
        .await?;

        TrashedListings::delete_by_id(&listing_id).exec(&txn).await?;

        txn.commit().await.context("Failed to commit restore")?;

        info!("Restored listing {} from trash", listing_id);
        Ok(true)
    }

    /// Permanently delete one trashed listing. Returns the backing image
    /// filename so the caller can clean the file up, or `None` when the id
    /// is not in the trash.
    pub async fn purge(&self, id: &str) -> Result<Option<String>> {
        let txn = self.conn.begin().await?;

        let Some(trashed) = TrashedListings::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        TrashedListings::delete_by_id(&trashed.id).exec(&txn).await?;

        txn.commit().await.context("Failed to commit purge")?;

        info!("Purged listing {}", trashed.id);
        Ok(Some(trashed.image))
    }

    /// Empty the trash. Returns the image filenames of the purged rows;
    /// an empty vec means the trash was already empty and nothing ran.
    pub async fn purge_all(&self) -> Result<Vec<String>> {
        let txn = self.conn.begin().await?;

        let trashed = TrashedListings::find().all(&txn).await?;
        if trashed.is_empty() {
            return Ok(Vec::new());
        }

        let images: Vec<String> = trashed.into_iter().map(|t| t.image).collect();

        TrashedListings::delete_many().exec(&txn).await?;

        txn.commit().await.context("Failed to commit purge all")?;

        info!("Purged {} listings from trash", images.len());
        Ok(images)
    }

    /// Case-insensitive substring search over name and id of the active set.
    pub async fn search(&self, query: &str) -> Result<Vec<listings::Model>> {
        Listings::find()
            .filter(
                Condition::any()
                    .add(listings::Column::Name.contains(query))
                    .add(listings::Column::Id.contains(query)),
            )
            .order_by_asc(listings::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to search listings")
    }
}
