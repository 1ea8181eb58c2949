//! SeaORM adapter for rounds.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::rounds;

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<rounds::Model>, sea_orm::DbErr> {
    rounds::Entity::find_by_id(id).one(conn).await
}

pub async fn find_open_for_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<rounds::Model>, sea_orm::DbErr> {
    rounds::Entity::find()
        .filter(rounds::Column::TableId.eq(table_id))
        .filter(rounds::Column::EndTime.is_null())
        .order_by_desc(rounds::Column::Id)
        .one(conn)
        .await
}

pub async fn create_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    signature: String,
) -> Result<rounds::Model, sea_orm::DbErr> {
    rounds::ActiveModel {
        id: NotSet,
        table_id: Set(table_id),
        signature: Set(signature),
        start_time: Set(time::OffsetDateTime::now_utc()),
        end_time: Set(None),
    }
    .insert(conn)
    .await
}

/// Close the round if it is still open. Returns rows changed.
pub async fn close_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<u64, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let result = rounds::Entity::update_many()
        .col_expr(rounds::Column::EndTime, Expr::value(Some(now)))
        .filter(rounds::Column::Id.eq(id))
        .filter(rounds::Column::EndTime.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
