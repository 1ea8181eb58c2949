//! Player and session repository functions.

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use crate::adapters::{players_sea, sessions_sea};
use crate::entities::{players, sessions};
use crate::errors::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    /// Identity issued upstream.
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub remote: String,
    pub player_id: i64,
    pub created_at: OffsetDateTime,
    pub closed_at: Option<OffsetDateTime>,
}

impl From<players::Model> for Player {
    fn from(model: players::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
        }
    }
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            id: model.id,
            remote: model.remote,
            player_id: model.player_id,
            created_at: model.created_at,
            closed_at: model.closed_at,
        }
    }
}

pub async fn select_or_insert_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: &str,
    name: &str,
) -> Result<Player, DomainError> {
    let row = players_sea::select_or_insert(conn, user_id, name).await?;
    Ok(Player::from(row))
}

pub async fn find_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<Player>, DomainError> {
    Ok(players_sea::find_by_id(conn, id).await?.map(Player::from))
}

pub async fn create_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
    remote: &str,
) -> Result<Session, DomainError> {
    let row = sessions_sea::create_session(conn, player_id, remote).await?;
    Ok(Session::from(row))
}

pub async fn open_session_for_remote<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    remote: &str,
) -> Result<Option<Session>, DomainError> {
    Ok(sessions_sea::find_open_by_remote(conn, remote)
        .await?
        .map(Session::from))
}

pub async fn open_sessions_for_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Vec<Session>, DomainError> {
    let rows = sessions_sea::find_open_by_player(conn, player_id).await?;
    Ok(rows.into_iter().map(Session::from).collect())
}

pub async fn close_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<bool, DomainError> {
    Ok(sessions_sea::close_session(conn, id).await? == 1)
}
