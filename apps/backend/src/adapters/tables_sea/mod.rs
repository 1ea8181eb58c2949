//! SeaORM adapter for tables - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::tables;

pub mod dto;

pub use dto::{TableCreate, TableUpdate};

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<tables::Model>, sea_orm::DbErr> {
    tables::Entity::find_by_id(table_id).one(conn).await
}

/// Only the lifecycle columns: start, end and signature.
pub async fn find_status<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<
    Option<(
        Option<time::OffsetDateTime>,
        Option<time::OffsetDateTime>,
        String,
    )>,
    sea_orm::DbErr,
> {
    tables::Entity::find_by_id(table_id)
        .select_only()
        .column(tables::Column::StartTime)
        .column(tables::Column::EndTime)
        .column(tables::Column::Signature)
        .into_tuple()
        .one(conn)
        .await
}

pub async fn create_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: TableCreate,
) -> Result<tables::Model, sea_orm::DbErr> {
    let table_active = tables::ActiveModel {
        id: NotSet,
        creator_id: Set(dto.creator_id),
        bet: Set(dto.bet),
        currency: Set(dto.currency),
        signature: Set(String::new()),
        created_at: Set(time::OffsetDateTime::now_utc()),
        start_time: Set(None),
        end_time: Set(None),
    };

    table_active.insert(conn).await
}

/// Apply the set fields of `dto`. Returns the number of rows changed.
///
/// Setting a start or end time only matches a row where that column is
/// still NULL, so the lifecycle stamps are written at most once.
pub async fn update_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: TableUpdate,
) -> Result<u64, sea_orm::DbErr> {
    if dto.is_empty() {
        return Ok(0);
    }

    let mut update = tables::Entity::update_many();
    if let Some(signature) = dto.signature {
        update = update.col_expr(tables::Column::Signature, Expr::value(signature));
    }
    update = update.filter(tables::Column::Id.eq(dto.id));
    if let Some(at) = dto.start_time {
        update = update
            .col_expr(tables::Column::StartTime, Expr::value(Some(at)))
            .filter(tables::Column::StartTime.is_null());
    }
    if let Some(at) = dto.end_time {
        update = update
            .col_expr(tables::Column::EndTime, Expr::value(Some(at)))
            .filter(tables::Column::EndTime.is_null());
    }

    let result = update.exec(conn).await?;
    Ok(result.rows_affected)
}

pub async fn find_open<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<tables::Model>, sea_orm::DbErr> {
    tables::Entity::find()
        .filter(tables::Column::EndTime.is_null())
        .order_by_asc(tables::Column::Id)
        .all(conn)
        .await
}
