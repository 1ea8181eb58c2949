//! SeaORM adapter for deals and deal orders.
//!
//! Both are looked up by table through their parent round.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, NotSet, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::entities::{deal_orders, deals, rounds};

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<deals::Model>, sea_orm::DbErr> {
    deals::Entity::find_by_id(id).one(conn).await
}

pub async fn find_open_for_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<deals::Model>, sea_orm::DbErr> {
    deals::Entity::find()
        .join(JoinType::InnerJoin, deals::Relation::Round.def())
        .filter(rounds::Column::TableId.eq(table_id))
        .filter(deals::Column::EndTime.is_null())
        .order_by_desc(deals::Column::Id)
        .one(conn)
        .await
}

pub async fn create_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
    signature: String,
) -> Result<deals::Model, sea_orm::DbErr> {
    deals::ActiveModel {
        id: NotSet,
        round_id: Set(round_id),
        signature: Set(signature),
        start_time: Set(time::OffsetDateTime::now_utc()),
        end_time: Set(None),
    }
    .insert(conn)
    .await
}

pub async fn close_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<u64, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let result = deals::Entity::update_many()
        .col_expr(deals::Column::EndTime, Expr::value(Some(now)))
        .filter(deals::Column::Id.eq(id))
        .filter(deals::Column::EndTime.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn find_open_order_for_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<deal_orders::Model>, sea_orm::DbErr> {
    deal_orders::Entity::find()
        .join(JoinType::InnerJoin, deal_orders::Relation::Deal.def())
        .join(JoinType::InnerJoin, deals::Relation::Round.def())
        .filter(rounds::Column::TableId.eq(table_id))
        .filter(deal_orders::Column::EndTime.is_null())
        .order_by_desc(deal_orders::Column::Id)
        .one(conn)
        .await
}

pub async fn create_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    deal_id: i64,
    participant_id: i64,
) -> Result<deal_orders::Model, sea_orm::DbErr> {
    deal_orders::ActiveModel {
        id: NotSet,
        deal_id: Set(deal_id),
        participant_id: Set(participant_id),
        signature: Set(String::new()),
        start_time: Set(time::OffsetDateTime::now_utc()),
        end_time: Set(None),
    }
    .insert(conn)
    .await
}

/// Record the card and close the order if it is still open.
pub async fn close_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    card: &str,
) -> Result<u64, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let result = deal_orders::Entity::update_many()
        .col_expr(deal_orders::Column::Signature, Expr::value(card))
        .col_expr(deal_orders::Column::EndTime, Expr::value(Some(now)))
        .filter(deal_orders::Column::Id.eq(id))
        .filter(deal_orders::Column::EndTime.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
