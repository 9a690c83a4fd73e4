#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, NaiveDate};
use crudkit::{FilterConfig, FilterDefinition, FilterType, QueryConditions, SortConfig};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::prelude::*;

pub mod user {
    use sea_orm::entity::prelude::*;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        #[sea_orm(unique)]
        pub email: String,
        pub status: String,
        pub role: String,
        pub age: i32,
        pub is_active: bool,
        pub created_at: DateTimeWithTimeZone,
        pub deleted_at: Option<DateTimeWithTimeZone>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub type UserRepository = crudkit::Repository<user::Entity, user::ActiveModel>;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// A migrated database holding the ten [`SEED`] users.
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    for row in SEED {
        row.active_model().insert(&db).await?;
    }
    Ok(db)
}

pub struct SeedUser {
    pub name: &'static str,
    pub email: &'static str,
    pub status: &'static str,
    pub role: &'static str,
    pub age: i32,
    pub is_active: bool,
    /// Local time at +07:00
    pub created_at: (u32, u32, u32, u32),
}

impl SeedUser {
    pub fn active_model(&self) -> user::ActiveModel {
        let (day, hour, minute, second) = self.created_at;
        user::ActiveModel {
            name: Set(self.name.to_string()),
            email: Set(self.email.to_string()),
            status: Set(self.status.to_string()),
            role: Set(self.role.to_string()),
            age: Set(self.age),
            is_active: Set(self.is_active),
            created_at: Set(jakarta(2024, 1, day, hour, minute, second)),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

/// A Jakarta wall-clock time as the UTC instant rows are stored with.
pub fn jakarta(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> DateTime<FixedOffset> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .and_then(|naive| crudkit::Timezone::default().localize(naive))
        .expect("valid seed timestamp")
}

const fn seed(
    name: &'static str,
    email: &'static str,
    status: &'static str,
    role: &'static str,
    age: i32,
    is_active: bool,
    created_at: (u32, u32, u32, u32),
) -> SeedUser {
    SeedUser {
        name,
        email,
        status,
        role,
        age,
        is_active,
        created_at,
    }
}

/// Ten users across three statuses. Ids follow insertion order, starting at 1.
pub const SEED: [SeedUser; 10] = [
    seed("Alice", "alice@example.com", "active", "admin", 34, true, (3, 9, 0, 0)),
    seed("Bob", "bob@example.com", "inactive", "user", 22, false, (4, 10, 0, 0)),
    seed("Carol", "carol@example.com", "active", "moderator", 28, true, (5, 0, 0, 0)),
    seed("Dave", "dave@example.com", "pending", "user", 41, true, (5, 12, 30, 0)),
    seed("Eve", "eve@example.com", "active", "user", 19, true, (5, 23, 59, 59)),
    seed("Frank", "frank@example.com", "inactive", "admin", 30, false, (6, 8, 0, 0)),
    seed("Grace", "grace@example.com", "active", "user", 45, true, (7, 14, 0, 0)),
    seed("Heidi", "heidi@example.com", "pending", "moderator", 27, false, (8, 16, 45, 0)),
    seed("Ivan", "ivan@johnson.org", "active", "user", 52, true, (9, 11, 15, 0)),
    seed("John", "john@example.com", "active", "admin", 28, true, (10, 7, 30, 0)),
];

/// The filter and sort schema the tests query users with.
pub fn user_filters() -> FilterDefinition {
    FilterDefinition::new()
        .add_filter("id", FilterConfig::new("id", FilterType::Id))
        .add_filter("name", FilterConfig::new("name", FilterType::String))
        .add_filter(
            "q",
            FilterConfig::new("name", FilterType::String).search_fields(["name", "email"]),
        )
        .add_filter(
            "status",
            FilterConfig::new("status", FilterType::String).table_name("users"),
        )
        .add_filter(
            "role",
            FilterConfig::new("role", FilterType::Enum).enum_values(["admin", "moderator", "user"]),
        )
        .add_filter("age", FilterConfig::new("age", FilterType::Number))
        .add_filter("is_active", FilterConfig::new("is_active", FilterType::Bool))
        .add_filter("created_at", FilterConfig::new("created_at", FilterType::Date))
        .add_filter(
            "created_between",
            FilterConfig::new("created_at", FilterType::DateTime),
        )
        .add_sort("id", SortConfig::allowed("id"))
        .add_sort("name", SortConfig::allowed("name"))
        .add_sort("age", SortConfig::allowed("age").table_name("users"))
        .add_sort("email", SortConfig::disabled("email"))
        .add_sort("joined", SortConfig::allowed("created_at"))
}

pub fn query(pairs: &[(&str, &str)]) -> QueryConditions {
    pairs.iter().copied().collect()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateUsersTable)]
    }
}

#[derive(DeriveMigrationName)]
pub struct CreateUsersTable;

#[async_trait::async_trait]
impl MigrationTrait for CreateUsersTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Status).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::Age).integer().not_null())
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Status,
    Role,
    Age,
    IsActive,
    CreatedAt,
    DeletedAt,
}
