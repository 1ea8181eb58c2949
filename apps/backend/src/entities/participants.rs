use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "participant_state")]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipantState {
    #[sea_orm(string_value = "FREE")]
    Free,
    #[sea_orm(string_value = "BUSY")]
    Busy,
    #[sea_orm(string_value = "READY")]
    Ready,
    #[sea_orm(string_value = "DISCONNECT")]
    Disconnect,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "table_id")]
    pub table_id: i64,
    #[sea_orm(column_name = "player_id")]
    pub player_id: Option<i64>,
    #[sea_orm(column_name = "seat_order", column_type = "SmallInteger")]
    pub seat_order: i16,
    pub state: ParticipantState,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tables::Entity",
        from = "Column::TableId",
        to = "super::tables::Column::Id"
    )]
    Table,
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::PlayerId",
        to = "super::players::Column::Id"
    )]
    Player,
}

impl Related<super::tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
