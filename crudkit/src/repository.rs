//! Generic repository over a sea-orm entity.
//!
//! [`CrudRepository`] carries the whole CRUD surface as default methods; an implementor only
//! names its entity and active model and hands out a connection. [`Repository`] is the
//! ready-made implementation for any entity.
//!
//! ```rust,ignore
//! let users = Repository::<user::Entity, user::ActiveModel>::new(db.clone());
//! let ctx = ExecContext::new().with_timeout(Duration::from_secs(5));
//!
//! let pagination = Pagination::new(conditions, &USER_FILTERS, options);
//! let page = users.find_page(&ctx, &pagination).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityName, EntityTrait,
    IntoActiveModel, PaginatorTrait, PrimaryKeyTrait,
};

use crate::context::ExecContext;
use crate::errors::ApiError;
use crate::pagination::Pagination;
use crate::response::{ListResponse, Meta};

pub type ModelOf<E> = <E as EntityTrait>::Model;
pub type PrimaryKeyOf<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

#[async_trait]
pub trait CrudRepository: Send + Sync
where
    Self::Entity: EntityTrait + Sync,
    Self::ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync,
    ModelOf<Self::Entity>: IntoActiveModel<Self::ActiveModel> + Send + Sync,
    PrimaryKeyOf<Self::Entity>: Clone + fmt::Debug + Send + Sync,
{
    type Entity: EntityTrait;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>;

    fn connection(&self) -> &DatabaseConnection;

    /// Name used in not-found errors and `Content-Range` headers.
    fn resource_name(&self) -> &str;

    /// Insert a new record.
    async fn create(
        &self,
        ctx: &ExecContext,
        model: Self::ActiveModel,
    ) -> Result<ModelOf<Self::Entity>, ApiError> {
        ctx.run("create", model.insert(self.connection())).await
    }

    /// Save a full record: every column is written, and a record whose primary key matches
    /// no row is inserted instead.
    async fn update(
        &self,
        ctx: &ExecContext,
        model: ModelOf<Self::Entity>,
    ) -> Result<ModelOf<Self::Entity>, ApiError> {
        let db = self.connection();
        let active: Self::ActiveModel = model.into_active_model().reset_all();
        ctx.run("update", async move {
            match active.clone().update(db).await {
                Err(DbErr::RecordNotUpdated) => {
                    tracing::debug!(resource = self.resource_name(), "No row updated, inserting");
                    active.insert(db).await
                }
                result => result,
            }
        })
        .await
    }

    /// Delete the row holding `model`'s primary key.
    async fn delete(&self, ctx: &ExecContext, model: ModelOf<Self::Entity>) -> Result<(), ApiError> {
        let active: Self::ActiveModel = model.into_active_model();
        let result = ctx.run("delete", active.delete(self.connection())).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::not_found(self.resource_name(), None));
        }
        Ok(())
    }

    async fn delete_by_id(
        &self,
        ctx: &ExecContext,
        id: PrimaryKeyOf<Self::Entity>,
    ) -> Result<(), ApiError> {
        let result = ctx
            .run(
                "delete",
                Self::Entity::delete_by_id(id.clone()).exec(self.connection()),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(ApiError::not_found(self.resource_name(), Some(format!("{id:?}"))));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`ApiError::NotFound`] when no row has this primary key.
    async fn find_by_id(
        &self,
        ctx: &ExecContext,
        id: PrimaryKeyOf<Self::Entity>,
    ) -> Result<ModelOf<Self::Entity>, ApiError> {
        let found = ctx
            .run(
                "find_by_id",
                Self::Entity::find_by_id(id.clone()).one(self.connection()),
            )
            .await?;
        found.ok_or_else(|| ApiError::not_found(self.resource_name(), Some(format!("{id:?}"))))
    }

    /// One page: filters, custom scopes, limit, offset and order.
    async fn find_all(
        &self,
        ctx: &ExecContext,
        pagination: &Pagination<Self::Entity>,
    ) -> Result<Vec<ModelOf<Self::Entity>>, ApiError> {
        let query = pagination.apply(Self::Entity::find());
        ctx.run("find_all", query.all(self.connection())).await
    }

    /// Every row matching the filters, ignoring the page window.
    async fn count(
        &self,
        ctx: &ExecContext,
        pagination: &Pagination<Self::Entity>,
    ) -> Result<u64, ApiError> {
        let query = pagination.apply_without_meta(Self::Entity::find());
        ctx.run("count", query.count(self.connection())).await
    }

    /// [`find_all`](Self::find_all) and [`count`](Self::count) as a list response.
    ///
    /// Two independent round-trips; rows written in between can make them disagree.
    async fn find_page(
        &self,
        ctx: &ExecContext,
        pagination: &Pagination<Self::Entity>,
    ) -> Result<ListResponse<ModelOf<Self::Entity>>, ApiError> {
        let items = self.find_all(ctx, pagination).await?;
        let total = self.count(ctx, pagination).await?;
        Ok(ListResponse::new(
            self.resource_name(),
            items,
            Meta::from_pagination(pagination, total),
        ))
    }
}

/// [`CrudRepository`] for any entity `E` with active model `A`.
pub struct Repository<E, A> {
    db: DatabaseConnection,
    resource: String,
    _marker: PhantomData<fn() -> (E, A)>,
}

impl<E: EntityTrait, A> Repository<E, A> {
    /// A repository named after the entity's table.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let resource = E::default().table_name().to_string();
        Self::with_resource_name(db, resource)
    }

    #[must_use]
    pub fn with_resource_name(db: DatabaseConnection, resource: impl Into<String>) -> Self {
        Self {
            db,
            resource: resource.into(),
            _marker: PhantomData,
        }
    }
}

impl<E, A> Clone for Repository<E, A> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            resource: self.resource.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, A> fmt::Debug for Repository<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl<E, A> CrudRepository for Repository<E, A>
where
    E: EntityTrait + Sync,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
    ModelOf<E>: IntoActiveModel<A> + Send + Sync,
    PrimaryKeyOf<E>: Clone + fmt::Debug + Send + Sync,
{
    type Entity = E;
    type ActiveModel = A;

    fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn resource_name(&self) -> &str {
        &self.resource
    }
}
