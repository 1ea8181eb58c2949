//! Table repository functions.

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use crate::adapters::{participants_sea, tables_sea};
use crate::entities::tables;
use crate::errors::domain::DomainError;
use crate::repos::participants::Participant;

pub use crate::entities::tables::Currency;
pub use tables_sea::{TableCreate, TableUpdate};

/// Number of seats at every table.
pub const SEAT_COUNT: i16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub id: i64,
    pub creator_id: Option<i64>,
    pub bet: i64,
    pub currency: Currency,
    pub signature: String,
    pub created_at: OffsetDateTime,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
}

impl Table {
    pub fn status(&self) -> TableStatus {
        TableStatus {
            start_time: self.start_time,
            end_time: self.end_time,
            signature: self.signature.clone(),
        }
    }
}

/// Lifecycle projection of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
    pub signature: String,
}

impl TableStatus {
    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Started and not yet finished.
    pub fn is_open(&self) -> bool {
        self.is_started() && !self.is_closed()
    }
}

impl From<tables::Model> for Table {
    fn from(model: tables::Model) -> Self {
        Self {
            id: model.id,
            creator_id: model.creator_id,
            bet: model.bet,
            currency: model.currency,
            signature: model.signature,
            created_at: model.created_at,
            start_time: model.start_time,
            end_time: model.end_time,
        }
    }
}

pub async fn find_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<Table>, DomainError> {
    let table = tables_sea::find_by_id(conn, table_id).await?;
    Ok(table.map(Table::from))
}

pub async fn table_status<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Option<TableStatus>, DomainError> {
    let status = tables_sea::find_status(conn, table_id).await?;
    Ok(status.map(|(start_time, end_time, signature)| TableStatus {
        start_time,
        end_time,
        signature,
    }))
}

pub async fn update_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: TableUpdate,
) -> Result<bool, DomainError> {
    let changed = tables_sea::update_table(conn, dto).await?;
    Ok(changed > 0)
}

/// Create the table and its four FREE seats. Run inside a transaction.
pub async fn create_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: TableCreate,
) -> Result<(Table, Vec<Participant>), DomainError> {
    let table = tables_sea::create_table(conn, dto).await?;
    let mut seats = Vec::with_capacity(SEAT_COUNT as usize);
    for order in 1..=SEAT_COUNT {
        let seat = participants_sea::create_seat(conn, table.id, order).await?;
        seats.push(Participant::from(seat));
    }
    Ok((Table::from(table), seats))
}

pub async fn open_tables<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<Table>, DomainError> {
    let rows = tables_sea::find_open(conn).await?;
    Ok(rows.into_iter().map(Table::from).collect())
}
