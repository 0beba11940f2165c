//! Typed per-entity handle over a [`Gateway`].

use std::marker::PhantomData;

use super::{Gateway, TableDeletion};
use crate::codec::Key;
use crate::entity::Entity;
use crate::error::Result;
use crate::table::TableDefinition;

/// Persistence operations for one entity type.
///
/// ```no_run
/// # use tablemap::{Collection, Entity, Gateway, Key};
/// # async fn example<Order: Entity>(gateway: &Gateway, order: Order) -> tablemap::Result<()> {
/// let orders: Collection<'_, Order> = gateway.collection();
/// orders.save(&order).await?;
/// let same = orders.load(&Key::new().field("region", "eu").field("number", 7)).await?;
/// # Ok(())
/// # }
/// ```
pub struct Collection<'g, T> {
    gateway: &'g Gateway,
    _entity: PhantomData<fn() -> T>,
}

impl<'g, T: Entity> Collection<'g, T> {
    pub(super) fn new(gateway: &'g Gateway) -> Self {
        Self {
            gateway,
            _entity: PhantomData,
        }
    }

    pub fn table_name(&self) -> String {
        self.gateway.table_name(T::schema())
    }

    pub async fn table(&self) -> Result<TableDefinition> {
        self.gateway.resolve_table(T::schema()).await
    }

    pub async fn save(&self, record: &T) -> Result<()> {
        self.gateway.save(record).await
    }

    pub async fn load(&self, key: &Key) -> Result<Option<T>> {
        self.gateway.load(key).await
    }

    pub async fn find(&self, key: &Key) -> Result<Vec<T>> {
        self.gateway.find(key).await
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.gateway.find(&Key::new()).await
    }

    pub async fn history(&self, record: &T) -> Result<Vec<T>> {
        self.gateway.history(record).await
    }

    pub async fn delete_all(&self) -> Result<TableDeletion> {
        self.gateway.delete_all::<T>().await
    }
}
