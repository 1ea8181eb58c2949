//! DTOs for tables_sea adapter.

use time::OffsetDateTime;

use crate::entities::tables::Currency;

#[derive(Debug, Clone)]
pub struct TableCreate {
    pub creator_id: Option<i64>,
    pub bet: i64,
    pub currency: Currency,
}

impl TableCreate {
    pub fn new(bet: i64, currency: Currency) -> Self {
        Self {
            creator_id: None,
            bet,
            currency,
        }
    }

    pub fn by(mut self, player_id: i64) -> Self {
        self.creator_id = Some(player_id);
        self
    }
}

/// Partial update of a table row. Unset fields are left untouched; start and
/// end times only apply to a row that does not have one yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUpdate {
    pub id: i64,
    pub signature: Option<String>,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
}

impl TableUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            signature: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_start_time(mut self, at: OffsetDateTime) -> Self {
        self.start_time = Some(at);
        self
    }

    pub fn with_end_time(mut self, at: OffsetDateTime) -> Self {
        self.end_time = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }
}
