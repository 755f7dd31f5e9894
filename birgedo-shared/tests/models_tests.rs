/// Integration tests for the persistence layer
///
/// Require a running PostgreSQL (see `common::setup`); ignored by default.
/// Run with: cargo test -p birgedo-shared --test models_tests -- --ignored

mod common;

use birgedo_shared::auth::tokens::TokenScope;
use birgedo_shared::db::migrations::{get_migration_status, run_migrations};
use birgedo_shared::db::pool::{close_pool, get_pool_stats, health_check};
use birgedo_shared::models::assignment::TaskAssignment;
use birgedo_shared::models::membership::RoomMembership;
use birgedo_shared::models::room::Room;
use birgedo_shared::models::task::Task;
use birgedo_shared::models::token::{hash_token, Token};
use birgedo_shared::models::user::{NewUser, User};
use birgedo_shared::models::DataError;
use chrono::Duration;

#[tokio::test]
#[ignore]
async fn test_pool_health_and_migration_status() {
    let pool = common::setup().await;

    health_check(&pool).await.expect("Health check failed");
    assert!(get_pool_stats(&pool).total_connections > 0);

    // A second run is a no-op
    run_migrations(&pool).await.expect("Second migration run failed");
    let status = get_migration_status(&pool).await.unwrap();
    assert!(status.is_up_to_date);
    assert!(status.pending.is_empty());
    assert!(status.applied_migrations >= 4);

    close_pool(pool).await;
}

#[tokio::test]
#[ignore]
async fn test_user_lookup_and_not_found() {
    let pool = common::setup().await;
    let user = common::create_user(&pool, "lookup").await;

    let by_id = User::get(&pool, user.id).await.unwrap();
    assert_eq!(by_id.email, user.email);
    assert_eq!(by_id.version, 1);

    let by_email = User::get_by_email(&pool, &user.email.to_uppercase()).await.unwrap();
    assert_eq!(by_email.id, user.id);

    assert!(matches!(User::get(&pool, i64::MAX).await, Err(DataError::NotFound)));
    assert!(matches!(
        User::get_by_email(&pool, "nobody-here@example.com").await,
        Err(DataError::NotFound)
    ));

    let all = User::get_all(&pool).await.unwrap();
    assert!(all.iter().any(|u| u.id == user.id));
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_rejected_once() {
    let pool = common::setup().await;
    let email = common::unique_email("dup");

    let new_user = |email: String| NewUser {
        name: "Dup".to_string(),
        email,
        password_hash: "hash".to_string(),
    };

    User::insert(&pool, new_user(email.clone())).await.unwrap();
    let second = User::insert(&pool, new_user(format!("  {}", email.to_uppercase()))).await;
    assert!(matches!(second, Err(DataError::DuplicateEmail)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore]
async fn test_user_update_uses_version() {
    let pool = common::setup().await;
    let mut first = common::create_user(&pool, "versioned").await;
    let mut stale = first.clone();

    first.name = "Renamed".to_string();
    first.update(&pool).await.unwrap();
    assert_eq!(first.version, 2);

    stale.name = "Lost update".to_string();
    assert!(matches!(stale.update(&pool).await, Err(DataError::EditConflict)));

    let other = common::create_user(&pool, "other").await;
    first.email = other.email.clone();
    assert!(matches!(first.update(&pool).await, Err(DataError::DuplicateEmail)));

    assert_eq!(User::get(&pool, first.id).await.unwrap().name, "Renamed");
}

#[tokio::test]
#[ignore]
async fn test_token_lifecycle() {
    let pool = common::setup().await;
    let user = common::create_user(&pool, "tokens").await;

    let (_, plaintext) =
        Token::new_token(&pool, user.id, Duration::hours(24), TokenScope::Authentication)
            .await
            .unwrap();

    let owner = User::get_for_token(&pool, TokenScope::Authentication, &plaintext)
        .await
        .unwrap();
    assert_eq!(owner.id, user.id);

    let stored: Vec<u8> = sqlx::query_scalar("SELECT hash FROM tokens WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, hash_token(&plaintext));

    let deleted = Token::delete_all_for_user(&pool, TokenScope::Authentication, user.id)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(matches!(
        User::get_for_token(&pool, TokenScope::Authentication, &plaintext).await,
        Err(DataError::NotFound)
    ));
}

#[tokio::test]
#[ignore]
async fn test_expired_token_does_not_authenticate() {
    let pool = common::setup().await;
    let user = common::create_user(&pool, "expired").await;

    let (token, plaintext) =
        Token::generate(user.id, Duration::hours(-1), TokenScope::Authentication);
    token.insert(&pool).await.unwrap();

    assert!(matches!(
        User::get_for_token(&pool, TokenScope::Authentication, &plaintext).await,
        Err(DataError::NotFound)
    ));
}

#[tokio::test]
#[ignore]
async fn test_room_round_trip_and_owner_membership() {
    let pool = common::setup().await;
    let owner = common::create_user(&pool, "owner").await;

    let room = Room::create_with_owner(&pool, "Flat chores", owner.id).await.unwrap();
    let loaded = Room::get_by_id(&pool, room.id).await.unwrap();
    assert_eq!(loaded.title, "Flat chores");

    assert!(RoomMembership::is_member(&pool, room.id, owner.id).await.unwrap());
    assert_eq!(
        RoomMembership::user_ids_by_room(&pool, room.id).await.unwrap(),
        vec![owner.id]
    );

    let rooms = Room::list_by_user(&pool, owner.id).await.unwrap();
    assert_eq!(rooms, vec![loaded.clone()]);

    let mut renamed = loaded;
    renamed.title = "Chores".to_string();
    renamed.update(&pool).await.unwrap();
    assert_eq!(Room::get_by_id(&pool, room.id).await.unwrap().title, "Chores");

    assert!(matches!(Room::get_by_id(&pool, i64::MAX).await, Err(DataError::NotFound)));
}

#[tokio::test]
#[ignore]
async fn test_room_with_unknown_owner_is_not_created() {
    let pool = common::setup().await;
    let title = common::unique_email("orphan-room");

    let result = Room::create_with_owner(&pool, &title, i64::MAX).await;
    assert!(matches!(result, Err(DataError::NotFound)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE title = $1")
        .bind(&title)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_membership() {
    let pool = common::setup().await;
    let owner = common::create_user(&pool, "owner").await;
    let room = Room::create_with_owner(&pool, "Dup members", owner.id).await.unwrap();

    assert!(matches!(
        RoomMembership::insert(&pool, owner.id, room.id).await,
        Err(DataError::DuplicateKey)
    ));
    assert!(matches!(
        RoomMembership::insert(&pool, i64::MAX, room.id).await,
        Err(DataError::NotFound)
    ));
}

#[tokio::test]
#[ignore]
async fn test_task_assigned_to_current_members_only() {
    let pool = common::setup().await;
    let alice = common::create_user(&pool, "alice").await;
    let bob = common::create_user(&pool, "bob").await;
    let carol = common::create_user(&pool, "carol").await;

    let room = Room::create_with_owner(&pool, "Shared", alice.id).await.unwrap();
    RoomMembership::insert(&pool, bob.id, room.id).await.unwrap();

    let (task, assigned) = Task::create_with_assignments(&pool, "Dishes", room.id)
        .await
        .unwrap();
    assert_eq!(assigned, 2);

    for user in [&alice, &bob] {
        let assignment = TaskAssignment::get(&pool, user.id, task.id).await.unwrap();
        assert!(!assignment.done);
    }

    // Joining later does not backfill
    RoomMembership::insert(&pool, carol.id, room.id).await.unwrap();
    assert!(matches!(
        TaskAssignment::get(&pool, carol.id, task.id).await,
        Err(DataError::NotFound)
    ));

    let states = TaskAssignment::list_by_room(&pool, room.id).await.unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].user_name, "alice");

    assert_eq!(Task::list_by_room(&pool, room.id).await.unwrap(), vec![task]);
}

#[tokio::test]
#[ignore]
async fn test_toggle_twice_restores_state() {
    let pool = common::setup().await;
    let user = common::create_user(&pool, "toggler").await;
    let room = Room::create_with_owner(&pool, "Toggle", user.id).await.unwrap();
    let (task, _) = Task::create_with_assignments(&pool, "Laundry", room.id).await.unwrap();

    let once = TaskAssignment::toggle(&pool, user.id, task.id).await.unwrap();
    assert!(once.done);

    let mine = TaskAssignment::list_by_user(&pool, user.id).await.unwrap();
    assert!(mine.iter().any(|t| t.task_id == task.id && t.done));

    let twice = TaskAssignment::toggle(&pool, user.id, task.id).await.unwrap();
    assert!(!twice.done);

    let stranger = common::create_user(&pool, "stranger").await;
    assert!(matches!(
        TaskAssignment::toggle(&pool, stranger.id, task.id).await,
        Err(DataError::NotFound)
    ));
}

#[tokio::test]
#[ignore]
async fn test_remove_member_drops_their_assignments() {
    let pool = common::setup().await;
    let alice = common::create_user(&pool, "alice").await;
    let bob = common::create_user(&pool, "bob").await;
    let room = Room::create_with_owner(&pool, "Leaving", alice.id).await.unwrap();
    RoomMembership::insert(&pool, bob.id, room.id).await.unwrap();
    let (task, _) = Task::create_with_assignments(&pool, "Mop", room.id).await.unwrap();

    assert!(RoomMembership::remove(&pool, bob.id, room.id).await.unwrap());
    assert!(!RoomMembership::is_member(&pool, room.id, bob.id).await.unwrap());
    assert!(matches!(
        TaskAssignment::get(&pool, bob.id, task.id).await,
        Err(DataError::NotFound)
    ));
    assert!(TaskAssignment::get(&pool, alice.id, task.id).await.is_ok());

    assert!(!RoomMembership::remove(&pool, bob.id, room.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_remove_task_is_scoped_to_room() {
    let pool = common::setup().await;
    let user = common::create_user(&pool, "remover").await;
    let room = Room::create_with_owner(&pool, "A", user.id).await.unwrap();
    let other_room = Room::create_with_owner(&pool, "B", user.id).await.unwrap();
    let (task, _) = Task::create_with_assignments(&pool, "Sweep", room.id).await.unwrap();

    assert!(!Task::remove_from_room(&pool, task.id, other_room.id).await.unwrap());
    assert!(Task::get_by_id(&pool, task.id).await.is_ok());

    assert!(Task::remove_from_room(&pool, task.id, room.id).await.unwrap());
    assert!(matches!(Task::get_by_id(&pool, task.id).await, Err(DataError::NotFound)));
    assert!(matches!(
        TaskAssignment::get(&pool, user.id, task.id).await,
        Err(DataError::NotFound)
    ));
}
