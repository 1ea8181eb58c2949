//! Round, deal and deal order repository functions.

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use crate::adapters::{deals_sea, rounds_sea};
use crate::entities::{deal_orders, deals, rounds};
use crate::errors::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: i64,
    pub table_id: i64,
    pub signature: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub id: i64,
    pub round_id: i64,
    pub signature: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
}

/// One turn within a deal. Open while the seat has not played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealOrder {
    pub id: i64,
    pub deal_id: i64,
    pub participant_id: i64,
    /// Card played, once closed.
    pub signature: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
}

impl Round {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

impl Deal {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

impl DealOrder {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

impl From<rounds::Model> for Round {
    fn from(model: rounds::Model) -> Self {
        Self {
            id: model.id,
            table_id: model.table_id,
            signature: model.signature,
            start_time: model.start_time,
            end_time: model.end_time,
        }
    }
}

impl From<deals::Model> for Deal {
    fn from(model: deals::Model) -> Self {
        Self {
            id: model.id,
            round_id: model.round_id,
            signature: model.signature,
            start_time: model.start_time,
            end_time: model.end_time,
        }
    }
}

impl From<deal_orders::Model> for DealOrder {
    fn from(model: deal_orders::Model) -> Self {
        Self {
            id: model.id,
            deal_id: model.deal_id,
            participant_id: model.participant_id,
            signature: model.signature,
            start_time: model.start_time,
            end_time: model.end_time,
        }
    }
}

pub async fn current_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<Round>, DomainError> {
    Ok(rounds_sea::find_open_for_table(conn, table_id)
        .await?
        .map(Round::from))
}

pub async fn find_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<Round>, DomainError> {
    Ok(rounds_sea::find_by_id(conn, id).await?.map(Round::from))
}

pub async fn insert_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    signature: &str,
) -> Result<Round, DomainError> {
    let row = rounds_sea::create_round(conn, table_id, signature.to_string()).await?;
    Ok(Round::from(row))
}

pub async fn close_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<bool, DomainError> {
    Ok(rounds_sea::close_round(conn, id).await? == 1)
}

pub async fn current_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<Deal>, DomainError> {
    Ok(deals_sea::find_open_for_table(conn, table_id)
        .await?
        .map(Deal::from))
}

pub async fn find_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<Deal>, DomainError> {
    Ok(deals_sea::find_by_id(conn, id).await?.map(Deal::from))
}

pub async fn insert_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
    signature: &str,
) -> Result<Deal, DomainError> {
    let row = deals_sea::create_deal(conn, round_id, signature.to_string()).await?;
    Ok(Deal::from(row))
}

pub async fn close_deal<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<bool, DomainError> {
    Ok(deals_sea::close_deal(conn, id).await? == 1)
}

pub async fn current_deal_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<DealOrder>, DomainError> {
    Ok(deals_sea::find_open_order_for_table(conn, table_id)
        .await?
        .map(DealOrder::from))
}

pub async fn insert_deal_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    deal_id: i64,
    participant_id: i64,
) -> Result<DealOrder, DomainError> {
    let row = deals_sea::create_order(conn, deal_id, participant_id).await?;
    Ok(DealOrder::from(row))
}

pub async fn close_deal_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    card: &str,
) -> Result<bool, DomainError> {
    Ok(deals_sea::close_order(conn, id, card).await? == 1)
}
