//! SeaORM adapter for sessions.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::sessions;

pub async fn create_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
    remote: &str,
) -> Result<sessions::Model, sea_orm::DbErr> {
    sessions::ActiveModel {
        id: NotSet,
        remote: Set(remote.to_string()),
        player_id: Set(player_id),
        created_at: Set(time::OffsetDateTime::now_utc()),
        closed_at: Set(None),
    }
    .insert(conn)
    .await
}

pub async fn find_open_by_remote<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    remote: &str,
) -> Result<Option<sessions::Model>, sea_orm::DbErr> {
    sessions::Entity::find()
        .filter(sessions::Column::Remote.eq(remote))
        .filter(sessions::Column::ClosedAt.is_null())
        .order_by_desc(sessions::Column::Id)
        .one(conn)
        .await
}

pub async fn find_open_by_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Vec<sessions::Model>, sea_orm::DbErr> {
    sessions::Entity::find()
        .filter(sessions::Column::PlayerId.eq(player_id))
        .filter(sessions::Column::ClosedAt.is_null())
        .order_by_asc(sessions::Column::Id)
        .all(conn)
        .await
}

pub async fn close_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<u64, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let result = sessions::Entity::update_many()
        .col_expr(sessions::Column::ClosedAt, Expr::value(Some(now)))
        .filter(sessions::Column::Id.eq(id))
        .filter(sessions::Column::ClosedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
