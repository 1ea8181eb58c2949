//! SeaORM adapter for participant seats.

use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::participants::{self, ParticipantState};

pub mod dto;

pub use dto::ParticipantUpdate;

fn state_expr(state: ParticipantState) -> sea_orm::sea_query::SimpleExpr {
    Expr::val(state).cast_as(Alias::new("participant_state"))
}

pub async fn create_seat<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    order: i16,
) -> Result<participants::Model, sea_orm::DbErr> {
    participants::ActiveModel {
        id: NotSet,
        table_id: Set(table_id),
        player_id: Set(None),
        seat_order: Set(order),
        state: Set(ParticipantState::Free),
    }
    .insert(conn)
    .await
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<participants::Model>, sea_orm::DbErr> {
    participants::Entity::find_by_id(id).one(conn).await
}

pub async fn find_all_by_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Vec<participants::Model>, sea_orm::DbErr> {
    participants::Entity::find()
        .filter(participants::Column::TableId.eq(table_id))
        .order_by_asc(participants::Column::SeatOrder)
        .all(conn)
        .await
}

pub async fn find_by_table_and_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    order: i16,
) -> Result<Option<participants::Model>, sea_orm::DbErr> {
    participants::Entity::find()
        .filter(participants::Column::TableId.eq(table_id))
        .filter(participants::Column::SeatOrder.eq(order))
        .one(conn)
        .await
}

pub async fn find_by_table_and_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    player_id: i64,
) -> Result<Option<participants::Model>, sea_orm::DbErr> {
    participants::Entity::find()
        .filter(participants::Column::TableId.eq(table_id))
        .filter(participants::Column::PlayerId.eq(player_id))
        .one(conn)
        .await
}

pub async fn find_all_by_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Vec<participants::Model>, sea_orm::DbErr> {
    participants::Entity::find()
        .filter(participants::Column::PlayerId.eq(player_id))
        .order_by_asc(participants::Column::Id)
        .all(conn)
        .await
}

/// Seat `player_id` only if the seat is still FREE. Returns rows changed.
pub async fn claim_seat<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    player_id: i64,
) -> Result<u64, sea_orm::DbErr> {
    let result = participants::Entity::update_many()
        .col_expr(participants::Column::State, state_expr(ParticipantState::Busy))
        .col_expr(participants::Column::PlayerId, Expr::value(Some(player_id)))
        .filter(participants::Column::Id.eq(id))
        .filter(participants::Column::State.eq(ParticipantState::Free))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn update_participant<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: ParticipantUpdate,
) -> Result<u64, sea_orm::DbErr> {
    if dto.state.is_none() && dto.player_id.is_none() {
        return Ok(0);
    }

    let mut update = participants::Entity::update_many();
    if let Some(state) = dto.state {
        update = update.col_expr(participants::Column::State, state_expr(state));
    }
    if let Some(player_id) = dto.player_id {
        update = update.col_expr(participants::Column::PlayerId, Expr::value(player_id));
    }

    let result = update
        .filter(participants::Column::Id.eq(dto.id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn count_in_state<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    state: ParticipantState,
) -> Result<u64, sea_orm::DbErr> {
    participants::Entity::find()
        .filter(participants::Column::TableId.eq(table_id))
        .filter(participants::Column::State.eq(state))
        .count(conn)
        .await
}
