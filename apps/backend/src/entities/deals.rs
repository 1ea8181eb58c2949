use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "round_id")]
    pub round_id: i64,
    pub signature: String,
    #[sea_orm(column_name = "start_time")]
    pub start_time: OffsetDateTime,
    #[sea_orm(column_name = "end_time")]
    pub end_time: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rounds::Entity",
        from = "Column::RoundId",
        to = "super::rounds::Column::Id"
    )]
    Round,
    #[sea_orm(has_many = "super::deal_orders::Entity")]
    DealOrders,
}

impl Related<super::rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Round.def()
    }
}

impl Related<super::deal_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DealOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
