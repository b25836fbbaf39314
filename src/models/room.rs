use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room metadata stored in Redis. The member set lives in a separate Redis
/// set key so that join/leave are single atomic commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub description: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: String, creator: String, is_private: bool, description: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            creator,
            description,
            is_private,
            created_at: Utc::now(),
        }
    }

    /// Join policy: private rooms cannot be joined through the public join
    /// path at all, membership notwithstanding; there is no invitation
    /// mechanism. Public rooms are open to any authenticated account.
    pub fn can_join(&self, _viewer: &str) -> bool {
        !self.is_private
    }

    /// Leave policy: the creator can never leave their own room, whatever
    /// the member set contains; deleting the room is their only exit.
    pub fn leave_blocked_for(&self, viewer: &str) -> bool {
        self.creator == viewer
    }

    /// Visibility predicate, evaluated on every access rather than stored.
    /// Public rooms are visible to everyone, including unauthenticated
    /// requesters. Private rooms are visible to members and to the creator;
    /// the creator is never auto-added to the member set, so they are
    /// authorized explicitly here.
    pub fn visible_to(&self, viewer: Option<&str>, members: &HashSet<String>) -> bool {
        if !self.is_private {
            return true;
        }
        match viewer {
            Some(id) => self.creator == id || members.contains(id),
            None => false,
        }
    }
}

/// Room plus its member set, as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub creator: String,
    pub description: String,
    pub is_private: bool,
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RoomView {
    pub fn new(room: Room, mut members: Vec<String>) -> Self {
        members.sort();
        Self {
            id: room.id,
            name: room.name,
            creator: room.creator,
            description: room.description,
            is_private: room.is_private,
            members,
            created_at: room.created_at,
        }
    }
}

/// Request to create a room
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Pagination query for room listing
#[derive(Debug, Default, Deserialize)]
pub struct ListRoomsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListRoomsQuery {
    /// page >= 1, limit clamped to [1, 100], defaults page=1 limit=10.
    pub fn normalize(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1) as usize;
        let limit = self.limit.unwrap_or(10).clamp(1, 100) as usize;
        (page, limit)
    }
}

/// Slice `items` for the given 1-based page. Out-of-range pages yield an
/// empty list, never an error. Returns the page contents and the total
/// page count (ceiling division).
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, usize) {
    let total_pages = items.len().div_ceil(limit);
    let start = (page - 1).saturating_mul(limit);

    if start >= items.len() {
        return (Vec::new(), total_pages);
    }

    let page_items = items.into_iter().skip(start).take(limit).collect();
    (page_items, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn room(is_private: bool) -> Room {
        Room::new("general".into(), "creator-1".into(), is_private, String::new())
    }

    fn members(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn public_room_visible_to_everyone() {
        let r = room(false);
        assert!(r.visible_to(None, &members(&[])));
        assert!(r.visible_to(Some("stranger"), &members(&[])));
    }

    #[test]
    fn private_room_hidden_from_strangers_and_anonymous() {
        let r = room(true);
        assert!(!r.visible_to(None, &members(&["member-1"])));
        assert!(!r.visible_to(Some("stranger"), &members(&["member-1"])));
    }

    #[test]
    fn private_room_visible_to_member() {
        let r = room(true);
        assert!(r.visible_to(Some("member-1"), &members(&["member-1"])));
    }

    #[test]
    fn private_room_visible_to_creator_even_without_membership() {
        let r = room(true);
        assert!(r.visible_to(Some("creator-1"), &members(&[])));
    }

    #[test]
    fn private_room_rejects_join_for_everyone() {
        let r = room(true);
        assert!(!r.can_join("stranger"));
        assert!(!r.can_join("member-1"));
        assert!(!r.can_join("creator-1"));
    }

    #[test]
    fn public_room_is_joinable() {
        let r = room(false);
        assert!(r.can_join("stranger"));
        assert!(r.can_join("creator-1"));
    }

    #[test]
    fn creator_is_always_blocked_from_leaving() {
        let r = room(true);
        assert!(r.leave_blocked_for("creator-1"));
        assert!(!r.leave_blocked_for("member-1"));

        let r = room(false);
        assert!(r.leave_blocked_for("creator-1"));
    }

    #[test]
    fn joining_twice_keeps_a_single_membership_entry() {
        let r = room(false);
        let mut set = members(&[]);

        assert!(r.can_join("member-1"));
        set.insert("member-1".to_string());
        set.insert("member-1".to_string());

        assert_eq!(set.len(), 1);
        assert!(r.visible_to(Some("member-1"), &set));
    }

    #[test]
    fn leave_then_rejoin_restores_membership() {
        let r = room(false);
        let mut set = members(&["member-1"]);

        set.remove("member-2"); // never a member, no-op
        assert_eq!(set.len(), 1);

        set.remove("member-1");
        assert!(set.is_empty());
        set.insert("member-1".to_string());
        assert_eq!(set, members(&["member-1"]));
    }

    #[test]
    fn query_normalization_defaults_and_clamps() {
        assert_eq!(ListRoomsQuery::default().normalize(), (1, 10));
        let q = ListRoomsQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(q.normalize(), (1, 100));
        let q = ListRoomsQuery {
            page: Some(-3),
            limit: Some(0),
        };
        assert_eq!(q.normalize(), (1, 1));
    }

    #[test]
    fn pagination_splits_25_items_by_10() {
        let items: Vec<u32> = (0..25).collect();

        let (p1, total) = paginate(items.clone(), 1, 10);
        assert_eq!(p1.len(), 10);
        assert_eq!(total, 3);

        let (p3, total) = paginate(items.clone(), 3, 10);
        assert_eq!(p3.len(), 5);
        assert_eq!(total, 3);
        assert_eq!(p3, vec![20, 21, 22, 23, 24]);

        // Out-of-range page is empty, not an error.
        let (p4, total) = paginate(items, 4, 10);
        assert!(p4.is_empty());
        assert_eq!(total, 3);
    }

    #[test]
    fn pagination_of_empty_list() {
        let (page, total) = paginate(Vec::<u32>::new(), 1, 10);
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn room_name_is_trimmed() {
        let r = Room::new("  Chat  ".into(), "creator-1".into(), true, String::new());
        assert_eq!(r.name, "Chat");
    }

    #[test]
    fn room_view_sorts_members() {
        let r = room(false);
        let view = RoomView::new(r, vec!["b".into(), "a".into(), "c".into()]);
        assert_eq!(view.members, vec!["a", "b", "c"]);
    }
}
