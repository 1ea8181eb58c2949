//! SeaORM adapter for players - generic over ConnectionTrait.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};

use crate::entities::players;

// Adapter functions return DbErr; repos layer maps to DomainError via From<DbErr>.

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<players::Model>, sea_orm::DbErr> {
    players::Entity::find_by_id(id).one(conn).await
}

pub async fn find_by_user_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: &str,
) -> Result<Option<players::Model>, sea_orm::DbErr> {
    players::Entity::find()
        .filter(players::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Insert the player unless one already exists for `user_id`, then return the
/// stored row.
pub async fn select_or_insert<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: &str,
    name: &str,
) -> Result<players::Model, sea_orm::DbErr> {
    if let Some(existing) = find_by_user_id(conn, user_id).await? {
        return Ok(existing);
    }

    let active = players::ActiveModel {
        id: NotSet,
        user_id: Set(user_id.to_string()),
        name: Set(name.to_string()),
        created_at: Set(time::OffsetDateTime::now_utc()),
    };
    players::Entity::insert(active)
        .on_conflict(
            OnConflict::column(players::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(conn)
        .await?;

    find_by_user_id(conn, user_id)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound("Player not found".to_string()))
}
