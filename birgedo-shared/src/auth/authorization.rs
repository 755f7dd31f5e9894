/// Authorization checks
///
/// Rooms are the only protected resource: a user may read or change a room,
/// its tasks and its memberships only while they are a member of it.
///
/// # Example
///
/// ```no_run
/// use birgedo_shared::auth::authorization::{require_room_access, AuthzError};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// match require_room_access(&pool, 10, 2).await {
///     Ok(room) => println!("user 2 may access {}", room.title),
///     Err(AuthzError::NotMember { .. }) => println!("forbidden"),
///     Err(AuthzError::RoomNotFound(_)) => println!("no such room"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use crate::models::membership::RoomMembership;
use crate::models::room::Room;
use crate::models::DataError;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("room {0} not found")]
    RoomNotFound(i64),

    #[error("user {user_id} is not a member of room {room_id}")]
    NotMember { room_id: i64, user_id: i64 },

    #[error("database error: {0}")]
    Database(#[from] DataError),
}

/// Requires `user_id` to be a member of `room_id`
///
/// # Returns
///
/// The room, so callers don't have to load it again
///
/// # Errors
///
/// - `AuthzError::RoomNotFound` if the room does not exist
/// - `AuthzError::NotMember` if the user is not among its members
pub async fn require_room_access(
    pool: &PgPool,
    room_id: i64,
    user_id: i64,
) -> Result<Room, AuthzError> {
    let room = match Room::get_by_id(pool, room_id).await {
        Ok(room) => room,
        Err(DataError::NotFound) => return Err(AuthzError::RoomNotFound(room_id)),
        Err(e) => return Err(e.into()),
    };

    let members = RoomMembership::user_ids_by_room(pool, room_id).await?;
    ensure_member(&members, room_id, user_id)?;

    Ok(room)
}

/// Checks a member list for `user_id`
pub fn ensure_member(members: &[i64], room_id: i64, user_id: i64) -> Result<(), AuthzError> {
    if members.contains(&user_id) {
        Ok(())
    } else {
        tracing::debug!(room_id, user_id, "Room access denied");
        Err(AuthzError::NotMember { room_id, user_id })
    }
}
