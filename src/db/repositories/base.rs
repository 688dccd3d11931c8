use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PrimaryKeyTrait, Select};
use std::marker::PhantomData;

use crate::error::{AppError, Result};

/// Generic repository base (grounded on the source's dynamically
/// forwarded base repository, expressed here as a Rust generic struct
/// composed by concrete repositories rather than forwarded by
/// reflection — Design Note 9.6). Every method logs at `debug`/`trace`
/// with operation name and timing, and classifies `DbErr` via
/// [`AppError::from_db_err`] before returning. Concrete repositories
/// add their own `select_active`/`soft_delete` (each entity's
/// `is_deleted` column is typed differently per table, so that part is
/// not worth generalizing further — see Design Note 9.6).
pub struct BaseRepository<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    conn: &'a C,
    _entity: PhantomData<E>,
}

impl<'a, C, E> BaseRepository<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: Send,
{
    pub fn new(conn: &'a C) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub async fn get_by_id(&self, id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType) -> Result<Option<E::Model>> {
        let start = std::time::Instant::now();
        let result = E::find_by_id(id).one(self.conn).await;
        tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "get_by_id");
        result.map_err(AppError::from_db_err)
    }

    pub async fn create<A>(&self, active_model: A) -> Result<E::Model>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        let start = std::time::Instant::now();
        let result = active_model.insert(self.conn).await;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "create");
        result.map_err(AppError::from_db_err)
    }

    pub async fn update<A>(&self, active_model: A) -> Result<E::Model>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        let start = std::time::Instant::now();
        let result = active_model.update(self.conn).await;
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "update");
        result.map_err(AppError::from_db_err)
    }

    /// Returns the row matched by `lookup`, inserting `create_attrs`
    /// when no row matches. Second tuple element is `true` on insert.
    pub async fn get_or_create<A>(&self, lookup: Select<E>, create_attrs: A) -> Result<(E::Model, bool)>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        if let Some(existing) = lookup.one(self.conn).await.map_err(AppError::from_db_err)? {
            return Ok((existing, false));
        }
        let created = self.create(create_attrs).await?;
        Ok((created, true))
    }
}
