use std::collections::HashSet;

use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::Result;
use crate::models::Room;

/// Room storage.
///
/// Key layout:
///   room:{id}          -> Room JSON (metadata, no members)
///   room:{id}:members  -> Redis set of account ids
///   rooms:index        -> sorted set of room ids scored by creation time
///
/// Membership mutations are single SADD/SREM commands, so join and leave are
/// atomic and idempotent at the store level. Multi-step sequences accept the
/// check-then-act race: a room deleted between an existence check and a
/// membership update surfaces as NotFound on the next read.
#[derive(Clone)]
pub struct RoomRepository {
    pool: Pool,
}

impl RoomRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // ==================== Room Operations ====================

    /// Create a new room
    pub async fn create_room(&self, room: &Room) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(room)?;

        conn.set::<_, _, ()>(format!("room:{}", room.id), json)
            .await?;
        conn.zadd::<_, _, _, ()>("rooms:index", &room.id, room.created_at.timestamp_millis())
            .await?;

        tracing::info!(room_id = %room.id, name = %room.name, "Room created");
        Ok(())
    }

    /// Get room by ID
    pub async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        let mut conn = self.pool.get().await?;

        let json: Option<String> = conn.get(format!("room:{}", room_id)).await?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// All rooms, newest first. Visibility filtering happens above the
    /// store; this returns every room.
    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        let mut conn = self.pool.get().await?;

        let ids: Vec<String> = conn.zrevrange("rooms:index", 0, -1).await?;

        let mut rooms = Vec::with_capacity(ids.len());
        for id in ids {
            // A room deleted after the index read is simply skipped.
            if let Some(room) = self.get_room(&id).await? {
                rooms.push(room);
            }
        }
        Ok(rooms)
    }

    /// Hard-delete a room: metadata, member set, and index entry.
    pub async fn delete_room(&self, room_id: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;

        let keys = vec![
            format!("room:{}", room_id),
            format!("room:{}:members", room_id),
        ];
        redis::cmd("DEL")
            .arg(&keys)
            .query_async::<()>(&mut *conn)
            .await?;
        conn.zrem::<_, _, ()>("rooms:index", room_id).await?;

        tracing::info!(room_id = %room_id, "Room deleted");
        Ok(())
    }

    // ==================== Member Operations ====================

    /// Add a member to a room. SADD is add-if-absent, so joining twice
    /// leaves a single entry.
    pub async fn add_member(&self, room_id: &str, user_id: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;

        conn.sadd::<_, _, ()>(format!("room:{}:members", room_id), user_id)
            .await?;

        tracing::debug!(room_id = %room_id, user_id = %user_id, "Member added");
        Ok(())
    }

    /// Remove a member from a room. No-op if they were never a member.
    pub async fn remove_member(&self, room_id: &str, user_id: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;

        conn.srem::<_, _, ()>(format!("room:{}:members", room_id), user_id)
            .await?;

        tracing::debug!(room_id = %room_id, user_id = %user_id, "Member removed");
        Ok(())
    }

    /// Get all members of a room
    pub async fn get_members(&self, room_id: &str) -> Result<HashSet<String>> {
        let mut conn = self.pool.get().await?;

        let members: Vec<String> = conn.smembers(format!("room:{}:members", room_id)).await?;
        Ok(members.into_iter().collect())
    }

    /// Check if user is a member
    pub async fn is_member(&self, room_id: &str, user_id: &str) -> Result<bool> {
        let mut conn = self.pool.get().await?;

        let is_member: bool = conn
            .sismember(format!("room:{}:members", room_id), user_id)
            .await?;
        Ok(is_member)
    }
}
