use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "currency")]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[sea_orm(string_value = "nuts")]
    Nuts,
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "usd")]
    Usd,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "creator_id")]
    pub creator_id: Option<i64>,
    pub bet: i64,
    pub currency: Currency,
    /// Rules-engine state; empty before the first round.
    pub signature: String,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "start_time")]
    pub start_time: Option<OffsetDateTime>,
    #[sea_orm(column_name = "end_time")]
    pub end_time: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::CreatorId",
        to = "super::players::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
    #[sea_orm(has_many = "super::rounds::Entity")]
    Rounds,
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rounds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
