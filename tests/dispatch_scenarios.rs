//! Routing scenarios exercised end to end through `Router::dispatch`.

use axum::http::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use refl::{
    step, App, ConfigError, Conn, Controller, DispatchError, Method, ResourceOptions, Router,
};

mod common;
use common::{arith, mock, trail, trail_of};

#[tokio::test]
async fn test_nested_scopes_accumulate_prefix_and_pipelines() {
    let router = Router::new();
    router.pipeline("web", vec![trail("web")]).unwrap();
    router.pipeline("dog", vec![trail("dog")]).unwrap();
    router.pipeline("cat", vec![trail("cat")]).unwrap();

    router
        .scope(|scope| {
            scope.set_prefix("/foo")?;
            scope.pipe_through("web")?;
            scope.nest(|scope| {
                scope.set_prefix("/bar")?;
                scope.pipe_through("dog")?;
                scope.nest(|scope| {
                    scope.set_prefix("/qux")?;
                    scope.pipe_through("cat")?;
                    assert_eq!(scope.prefix(), "/foo/bar/qux");
                    assert_eq!(scope.pipes_through(), ["web", "dog", "cat"]);
                    scope.get("/leaf", trail("handler"))
                })
            })
        })
        .unwrap();

    let conn = router.dispatch(mock(Method::Get, "/foo/bar/qux/leaf")).await.unwrap();
    assert_eq!(trail_of(&conn), ["web", "dog", "cat", "handler"]);
}

#[tokio::test]
async fn test_pipelines_compose_in_order() {
    let router = Router::new();
    router.pipeline("add", vec![arith(|n| n + 1), arith(|n| n + 2)]).unwrap();
    router.pipeline("double", vec![arith(|n| n * 2)]).unwrap();

    router
        .scope(|scope| {
            scope.pipe_through("add")?;
            scope.pipe_through("double")?;
            scope.get("/calc", |conn: Conn| async move { Ok(conn) })
        })
        .unwrap();

    let conn = router.dispatch(mock(Method::Get, "/calc")).await.unwrap();
    assert_eq!(conn.get("n"), Some(&Value::from(6)));
}

#[tokio::test]
async fn test_params_from_query_and_path() {
    let router = Router::new();
    router
        .scope(|scope| {
            scope.get("/users/:user_id/comments/:id", |conn: Conn| async move { Ok(conn) })
        })
        .unwrap();

    let conn = router
        .dispatch(mock(Method::Get, "/users/10/comments/15?sort=desc&filter%5Bauthor%5D=luiz"))
        .await
        .unwrap();

    assert_eq!(conn.param("user_id"), Some("10"));
    assert_eq!(conn.param("id"), Some("15"));
    assert_eq!(conn.param("sort"), Some("desc"));
    let filter = conn.params()["filter"].as_map().unwrap();
    assert_eq!(filter["author"].as_str(), Some("luiz"));
}

#[tokio::test]
async fn test_not_found_paths() {
    let router = Router::new();
    router
        .scope(|scope| {
            scope.get("/posts/:id", |mut conn: Conn| async move {
                if conn.param("id") == Some("0") {
                    return Err(conn.not_found());
                }
                Ok(conn)
            })
        })
        .unwrap();

    let err = router.dispatch(mock(Method::Get, "/posts/0")).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = router.dispatch(mock(Method::Post, "/posts/1")).await.unwrap_err();
    assert!(matches!(err, DispatchError::RouteNotFound { .. }));

    let err = router.dispatch(mock(Method::Get, "/posts/1/extra")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_step_failure_keeps_status_set_before_it() {
    let router = Router::new();
    router
        .pipeline(
            "auth",
            vec![step(|mut conn: Conn| async move {
                conn.status(StatusCode::FORBIDDEN);
                Err(conn.error("backend said no"))
            })],
        )
        .unwrap();
    router
        .scope(|scope| {
            scope.pipe_through("auth")?;
            scope.get("/admin", trail("handler"))
        })
        .unwrap();

    let err = router.dispatch(mock(Method::Get, "/admin")).await.unwrap_err();
    assert!(matches!(err, DispatchError::Other { .. }));
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(err.to_string(), "backend said no");
}

#[tokio::test]
async fn test_reset_keeps_router_usable() {
    let router = Arc::new(Router::new());
    let held = router.clone();

    router.pipeline("web", vec![trail("web")]).unwrap();
    router.scope(|scope| scope.get("/a", trail("a"))).unwrap();

    router.reset();
    assert!(held.dispatcher().is_empty());
    assert!(held.pipeline_names().is_empty());

    held.pipeline("web", vec![trail("web2")]).unwrap();
    held.scope(|scope| {
        scope.pipe_through("web")?;
        scope.get("/a", trail("a2"))
    })
    .unwrap();

    let conn = router.dispatch(mock(Method::Get, "/a")).await.unwrap();
    assert_eq!(trail_of(&conn), ["web2", "a2"]);
}

#[tokio::test]
async fn test_concurrent_dispatches_are_independent() {
    let router = Arc::new(Router::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (gauge, top) = (in_flight.clone(), peak.clone());
    router
        .scope(move |scope| {
            scope.get("/slow/:n", move |mut conn: Conn| {
                let (gauge, top) = (gauge.clone(), top.clone());
                async move {
                    let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
                    top.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    gauge.fetch_sub(1, Ordering::SeqCst);
                    let n = conn.param("n").unwrap_or_default().to_string();
                    conn.set("n", n);
                    Ok(conn)
                }
            })
        })
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = router.clone();
            let conn = mock(Method::Get, &format!("/slow/{i}"));
            tokio::spawn(async move { router.dispatch(conn).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let conn = handle.await.unwrap().unwrap();
        assert_eq!(conn.get("n"), Some(&Value::from(i.to_string())));
    }
    assert!(peak.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn test_app_actions_and_resources() {
    let app = App::new("Blog");
    app.controller(
        Controller::new("PostsController")
            .action("index", |mut conn: Conn| async move {
                conn.text("index");
                Ok(conn)
            })
            .action("show", |mut conn: Conn| async move {
                let id = conn.param("id").unwrap_or_default().to_string();
                conn.text(format!("show {id}"));
                Ok(conn)
            }),
    );

    app.router()
        .pipeline("web", vec![step(|conn: Conn| async move { Ok(conn) })])
        .unwrap();
    app.router()
        .scope(|scope| {
            scope.pipe_through("web")?;
            scope.get("/home", "PostsController#index")?;
            scope.resources(&["posts"], "PostsController", ResourceOptions::default())
        })
        .unwrap();

    // index + show only: the controller defines nothing else
    assert_eq!(app.router().dispatcher().len(), 3);

    let conn = app.router().dispatch(mock(Method::Get, "/posts/42")).await.unwrap();
    assert_eq!(conn.resp_body(), Some("show 42"));

    let err = app.router().scope(|scope| scope.get("/x", "PostsController@edit")).unwrap_err();
    assert!(matches!(err, ConfigError::ActionNotFound { .. }));
}
