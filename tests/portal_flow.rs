use std::net::TcpListener;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use sqlx::SqlitePool;

use oa_portal::client::{AuthState, ClientError, PortalClient};
use oa_portal::config::Config;
use oa_portal::db::memory_pool;
use oa_portal::directory::{self, CreatePrincipal};
use oa_portal::model::leave_request::LeaveType;
use oa_portal::model::role::{Role, RoleSet};
use oa_portal::routes;
use oa_portal::workflow::SubmitLeave;

async fn seed_principal(
    pool: &SqlitePool,
    username: &str,
    roles: RoleSet,
    manager_id: Option<i64>,
) -> i64 {
    directory::create_principal(
        pool,
        CreatePrincipal {
            username: username.to_string(),
            password: "pw".to_string(),
            real_name: username.to_uppercase(),
            roles: Some(roles),
            manager_id,
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
}

/// Boots the real HTTP server on an ephemeral port. Seeds admin `root`,
/// manager `boss`, and employees `alice`/`eve` reporting to boss.
async fn spawn_portal() -> (String, SqlitePool) {
    let pool = memory_pool().await;

    seed_principal(&pool, "root", RoleSet::admin(), None).await;
    let boss = seed_principal(&pool, "boss", RoleSet::employee(), None).await;
    seed_principal(&pool, "alice", RoleSet::employee(), Some(boss)).await;
    seed_principal(&pool, "eve", RoleSet::employee(), Some(boss)).await;

    let config = Config::for_tests();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let app_pool = pool.clone();
    let app_config = config.clone();
    let server = HttpServer::new(move || {
        let route_config = app_config.clone();
        App::new()
            .wrap(NormalizePath::trim())
            .app_data(Data::new(app_pool.clone()))
            .app_data(Data::new(app_config.clone()))
            .configure(move |cfg| routes::configure(cfg, route_config.clone()))
    })
    .listen(listener)
    .unwrap()
    .workers(1)
    .run();

    actix_web::rt::spawn(server);

    (format!("http://{addr}"), pool)
}

fn leave(start: &str, end: &str, reason: &str) -> SubmitLeave {
    SubmitLeave {
        leave_type: LeaveType::Annual,
        start_date: start.parse().unwrap(),
        end_date: end.parse().unwrap(),
        reason: reason.to_string(),
    }
}

async fn login(base: &str, username: &str) -> PortalClient {
    let mut client = PortalClient::new(base).unwrap();
    client.login(username, "pw").await.unwrap();
    client
}

#[actix_web::test]
async fn submit_approve_and_already_decided() {
    let (base, _pool) = spawn_portal().await;

    // unauthenticated probe: explicit 401, not a transport error
    let mut anonymous = PortalClient::new(&base).unwrap();
    assert!(matches!(
        anonymous.restore_session().await.unwrap(),
        AuthState::Anonymous
    ));
    assert!(matches!(
        anonymous.my_leaves().await,
        Err(ClientError::Unauthenticated)
    ));

    let alice = login(&base, "alice").await;
    let ctx = alice.session().unwrap();
    assert!(ctx.can(Role::Employee));
    assert!(!ctx.can(Role::Admin));

    let created = alice
        .submit_leave(&leave("2024-05-01", "2024-05-03", "travel"))
        .await
        .unwrap();
    assert_eq!(created.status, "PENDING");
    assert_eq!(created.approver_username.as_deref(), Some("boss"));

    let mine = alice.my_leaves().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].employee_username.as_deref(), Some("alice"));

    let boss = login(&base, "boss").await;
    let queue = boss.leaves_to_approve().await.unwrap();
    assert_eq!(queue.len(), 1);

    let decided = boss.approve_leave(created.id, Some("ok")).await.unwrap();
    assert_eq!(decided.status, "APPROVED");
    assert_eq!(decided.approver_comment.as_deref(), Some("ok"));
    assert!(decided.decided_at.is_some());

    // a second decision on the same id is a conflict, whichever direction
    match boss.reject_leave(created.id, None).await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "AlreadyDecided");
        }
        other => panic!("expected AlreadyDecided conflict, got {other:?}"),
    }
}

#[actix_web::test]
async fn only_the_approver_or_an_admin_may_decide() {
    let (base, _pool) = spawn_portal().await;

    let alice = login(&base, "alice").await;
    let created = alice
        .submit_leave(&leave("2024-06-01", "2024-06-02", "errand"))
        .await
        .unwrap();

    let eve = login(&base, "eve").await;
    match eve.approve_leave(created.id, None).await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(code, "Forbidden");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }

    // status unchanged, still visible on the admin panel
    let root = login(&base, "root").await;
    let pending = root.pending_leaves().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, "PENDING");

    // the admin override decides on behalf of the resolved approver
    let decided = root.reject_leave(created.id, Some("policy")).await.unwrap();
    assert_eq!(decided.status, "REJECTED");
}

#[actix_web::test]
async fn logout_clears_both_sides() {
    let (base, _pool) = spawn_portal().await;

    let mut alice = login(&base, "alice").await;
    assert!(matches!(
        alice.restore_session().await.unwrap(),
        AuthState::Authenticated(_)
    ));

    let outcome = alice.logout().await;
    assert!(outcome.server_acknowledged);
    assert!(alice.session().is_none());

    // the server no longer recognizes the token either
    assert!(matches!(
        alice.restore_session().await.unwrap(),
        AuthState::Anonymous
    ));
    assert!(matches!(
        alice.my_leaves().await,
        Err(ClientError::Unauthenticated)
    ));
}

#[actix_web::test]
async fn invalid_credentials_and_validation_errors() {
    let (base, pool) = spawn_portal().await;

    let mut client = PortalClient::new(&base).unwrap();
    assert!(matches!(
        client.login("alice", "wrong").await,
        Err(ClientError::Unauthenticated)
    ));
    assert!(matches!(
        client.login("nobody", "pw").await,
        Err(ClientError::Unauthenticated)
    ));

    sqlx::query("UPDATE users SET status = 'LEFT' WHERE username = 'eve'")
        .execute(&pool)
        .await
        .unwrap();
    match client.login("eve", "pw").await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(code, "AccountInactive");
        }
        other => panic!("expected AccountInactive, got {other:?}"),
    }

    let alice = login(&base, "alice").await;
    match alice
        .submit_leave(&leave("2024-05-03", "2024-05-01", "travel"))
        .await
    {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(code, "ValidationError");
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
    assert!(alice.my_leaves().await.unwrap().is_empty());
}

#[actix_web::test]
async fn attendance_pair_over_http() {
    let (base, _pool) = spawn_portal().await;

    let alice = login(&base, "alice").await;

    match alice.check_out().await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "NoCheckInYet");
        }
        other => panic!("expected NoCheckInYet, got {other:?}"),
    }

    let record = alice.check_in().await.unwrap();
    assert!(record.check_in.is_some());

    match alice.check_in().await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "AlreadyCheckedIn");
        }
        other => panic!("expected AlreadyCheckedIn, got {other:?}"),
    }

    let record = alice.check_out().await.unwrap();
    assert!(record.check_out.is_some());

    let history = alice.my_attendance().await.unwrap();
    assert_eq!(history.len(), 1);
}

#[actix_web::test]
async fn admin_manages_staff() {
    let (base, pool) = spawn_portal().await;

    let root = login(&base, "root").await;

    let candidates = root.manager_candidates().await.unwrap();
    assert!(candidates.iter().any(|c| c.username == "boss"));

    let created = root
        .create_user(&CreatePrincipal {
            username: "frank".to_string(),
            password: "pw".to_string(),
            real_name: "FRANK".to_string(),
            manager_id: candidates.iter().find(|c| c.username == "boss").map(|c| c.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.manager_username.as_deref(), Some("boss"));
    assert!(created.roles.contains(Role::Employee));

    match root
        .create_user(&CreatePrincipal {
            username: "frank".to_string(),
            password: "pw".to_string(),
            real_name: "FRANK".to_string(),
            ..Default::default()
        })
        .await
    {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "DuplicateUsername");
        }
        other => panic!("expected DuplicateUsername, got {other:?}"),
    }

    // the acting admin cannot delete its own account
    let users = root.list_users().await.unwrap();
    let self_id = users.iter().find(|u| u.username == "root").unwrap().id;
    match root.delete_user(self_id).await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 409);
            assert_eq!(code, "CannotDeleteSelf");
        }
        other => panic!("expected CannotDeleteSelf, got {other:?}"),
    }

    root.delete_user(created.id).await.unwrap();
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'frank'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    // role-gated endpoint rejects a plain employee
    let eve = login(&base, "eve").await;
    match eve.list_users().await {
        Err(ClientError::Api { status, code, .. }) => {
            assert_eq!(status, 403);
            assert_eq!(code, "Forbidden");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
}
