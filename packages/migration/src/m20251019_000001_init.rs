use sea_orm::Statement;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::extension::postgres::Type as PgType;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Players {
    Table,
    Id,
    UserId,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    Remote,
    PlayerId,
    CreatedAt,
    ClosedAt,
}

#[derive(Iden)]
enum Tables {
    Table,
    Id,
    CreatorId,
    Bet,
    Currency,
    Signature,
    CreatedAt,
    StartTime,
    EndTime,
}

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    TableId,
    PlayerId,
    SeatOrder,
    State,
}

#[derive(Iden)]
enum Rounds {
    Table,
    Id,
    TableId,
    Signature,
    StartTime,
    EndTime,
}

#[derive(Iden)]
enum Deals {
    Table,
    Id,
    RoundId,
    Signature,
    StartTime,
    EndTime,
}

#[derive(Iden)]
enum DealOrders {
    Table,
    Id,
    DealId,
    ParticipantId,
    Signature,
    StartTime,
    EndTime,
}

#[derive(Iden)]
enum CurrencyEnum {
    #[iden = "currency"]
    Type,
}

#[derive(Iden)]
enum ParticipantStateEnum {
    #[iden = "participant_state"]
    Type,
}

/// "At most one open row" guards. The backend maps a violation of each name
/// to the matching domain conflict.
const OPEN_ROW_INDEXES: [(&str, &str, &str); 4] = [
    ("idx_rounds_open_per_table", "rounds", "table_id"),
    ("idx_deals_open_per_round", "deals", "round_id"),
    ("idx_deal_orders_open_per_deal", "deal_orders", "deal_id"),
    ("idx_sessions_open_remote", "sessions", "remote"),
];

fn closed_column(table: &str) -> &'static str {
    if table == "sessions" {
        "closed_at"
    } else {
        "end_time"
    }
}

async fn enum_exists(manager: &SchemaManager<'_>, enum_name: &str) -> Result<bool, DbErr> {
    let result = manager
        .get_connection()
        .query_one(Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            format!("SELECT 1 FROM pg_type WHERE typname = '{enum_name}'"),
        ))
        .await?;
    Ok(result.is_some())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != sea_orm::DatabaseBackend::Postgres {
            return Err(DbErr::Custom("Unsupported database backend".into()));
        }

        if !enum_exists(manager, "currency").await? {
            manager
                .create_type(
                    PgType::create()
                        .as_enum(CurrencyEnum::Type)
                        .values(["nuts", "gold", "usd"])
                        .to_owned(),
                )
                .await?;
        }
        if !enum_exists(manager, "participant_state").await? {
            manager
                .create_type(
                    PgType::create()
                        .as_enum(ParticipantStateEnum::Type)
                        .values(["FREE", "BUSY", "READY", "DISCONNECT"])
                        .to_owned(),
                )
                .await?;
        }

        // players
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Players::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Players::UserId).string().not_null())
                    .col(ColumnDef::new(Players::Name).string().not_null())
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_players_user_id_unique")
                    .table(Players::Table)
                    .col(Players::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // sessions
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Sessions::Remote).string().not_null())
                    .col(ColumnDef::new(Sessions::PlayerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_player_id")
                            .from(Sessions::Table, Sessions::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_sessions_player_id")
                    .table(Sessions::Table)
                    .col(Sessions::PlayerId)
                    .to_owned(),
            )
            .await?;

        // tables
        manager
            .create_table(
                Table::create()
                    .table(Tables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tables::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Tables::CreatorId).big_integer().null())
                    .col(
                        ColumnDef::new(Tables::Bet)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Tables::Bet).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Tables::Currency)
                            .custom(CurrencyEnum::Type)
                            .not_null()
                            .default("nuts"),
                    )
                    .col(
                        ColumnDef::new(Tables::Signature)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Tables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tables::StartTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Tables::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tables_creator_id")
                            .from(Tables::Table, Tables::CreatorId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // participants
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Participants::TableId).big_integer().not_null())
                    .col(ColumnDef::new(Participants::PlayerId).big_integer().null())
                    .col(
                        ColumnDef::new(Participants::SeatOrder)
                            .small_integer()
                            .not_null()
                            .check(Expr::col(Participants::SeatOrder).between(1, 4)),
                    )
                    .col(
                        ColumnDef::new(Participants::State)
                            .custom(ParticipantStateEnum::Type)
                            .not_null()
                            .default("FREE"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participants_table_id")
                            .from(Participants::Table, Participants::TableId)
                            .to(Tables::Table, Tables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participants_player_id")
                            .from(Participants::Table, Participants::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_participants_table_order")
                    .table(Participants::Table)
                    .col(Participants::TableId)
                    .col(Participants::SeatOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // NULL player ids never collide, so free seats are unconstrained
        manager
            .create_index(
                Index::create()
                    .name("idx_participants_table_player")
                    .table(Participants::Table)
                    .col(Participants::TableId)
                    .col(Participants::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // rounds
        manager
            .create_table(
                Table::create()
                    .table(Rounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rounds::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Rounds::TableId).big_integer().not_null())
                    .col(ColumnDef::new(Rounds::Signature).text().not_null())
                    .col(
                        ColumnDef::new(Rounds::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rounds::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rounds_table_id")
                            .from(Rounds::Table, Rounds::TableId)
                            .to(Tables::Table, Tables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // deals
        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deals::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Deals::RoundId).big_integer().not_null())
                    .col(ColumnDef::new(Deals::Signature).text().not_null())
                    .col(
                        ColumnDef::new(Deals::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Deals::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_round_id")
                            .from(Deals::Table, Deals::RoundId)
                            .to(Rounds::Table, Rounds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // deal_orders
        manager
            .create_table(
                Table::create()
                    .table(DealOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DealOrders::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(DealOrders::DealId).big_integer().not_null())
                    .col(
                        ColumnDef::new(DealOrders::ParticipantId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DealOrders::Signature)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(DealOrders::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DealOrders::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_orders_deal_id")
                            .from(DealOrders::Table, DealOrders::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_orders_participant_id")
                            .from(DealOrders::Table, DealOrders::ParticipantId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // partial unique indexes are not expressible through the builder
        let conn = manager.get_connection();
        for (name, table, column) in OPEN_ROW_INDEXES {
            conn.execute(Statement::from_string(
                sea_orm::DatabaseBackend::Postgres,
                format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} ({column}) WHERE {} IS NULL",
                    closed_column(table)
                ),
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order; indexes go with their tables
        for table in [
            DealOrders::Table.into_iden(),
            Deals::Table.into_iden(),
            Rounds::Table.into_iden(),
            Participants::Table.into_iden(),
            Tables::Table.into_iden(),
            Sessions::Table.into_iden(),
            Players::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }

        manager
            .drop_type(
                PgType::drop()
                    .if_exists()
                    .name(ParticipantStateEnum::Type)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_type(PgType::drop().if_exists().name(CurrencyEnum::Type).to_owned())
            .await?;

        Ok(())
    }
}
