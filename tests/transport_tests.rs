use std::time::Duration;

use axum::{routing::get, Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tokio_util::sync::CancellationToken;

use scan_dash_rs::dashboard::{spawn_controller, Dashboard, DashboardInput};
use scan_dash_rs::scan::ScanPhase;
use scan_dash_rs::sysinfo::{fetch_system_info, load_system_info, InfoError};
use scan_dash_rs::transport;
use scan_dash_rs::types::SystemInfo;

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

async fn send_text(ws: &mut WebSocketStream<TcpStream>, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

#[tokio::test]
async fn transport_joins_namespace_and_relays_events() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Fake Socket.IO backend.
    let backend = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        send_text(
            &mut ws,
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#,
        )
        .await;
        assert_eq!(next_text(&mut ws).await, "40");
        send_text(&mut ws, r#"40{"sid":"n1"}"#).await;

        // The start request queued before the connection is flushed after joining.
        assert_eq!(next_text(&mut ws).await, r#"42["start_scan"]"#);

        send_text(&mut ws, "2").await;
        assert_eq!(next_text(&mut ws).await, "3");

        send_text(&mut ws, r#"42["scan_status",{"status":"En cours..."}]"#).await;
        send_text(&mut ws, r#"42["wan_latency",{"latency":-1}]"#).await;
        send_text(&mut ws, r#"42["unknown_event",{}]"#).await;
        send_text(
            &mut ws,
            r#"42["scan_results",{"timestamp":"2024-01-01 10:00:00","network":"192.168.1.0/24","hosts":[{"ip":"192.168.1.1","hostname":"router","ports":[{"port":80,"service":"http","version":"","protocol":"tcp"}]}]}]"#,
        )
        .await;

        // Drain until the client closes.
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (handle, controller) = spawn_controller(Dashboard::default(), out_tx, cancel.clone());
    handle.send(DashboardInput::StartRequested);

    let url = format!("ws://{addr}/socket.io/?EIO=4&transport=websocket");
    let transport_task = tokio::spawn(transport::run(
        url,
        handle.clone(),
        out_rx,
        Duration::from_millis(50),
        cancel.clone(),
    ));

    let mut updates = handle.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.scan.phase() == ScanPhase::Succeeded),
    )
    .await
    .expect("scan settled in time")
    .expect("controller alive");

    let snap = handle.snapshot();
    let hosts = snap.scan.hosts().unwrap();
    assert_eq!(hosts[0].hostname, "router");
    assert_eq!(hosts[0].ports[0].version, None);
    assert_eq!(snap.latency.values, vec![None]);

    cancel.cancel();
    transport_task.await.unwrap();
    controller.await.unwrap();
    backend.await.unwrap();
}

#[tokio::test]
async fn silent_backend_is_dropped_after_heartbeat_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (reconnected_tx, reconnected_rx) = tokio::sync::oneshot::channel();
    let backend = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut first = accept_async(tcp).await.unwrap();
        send_text(
            &mut first,
            r#"0{"sid":"a","upgrades":[],"pingInterval":50,"pingTimeout":50}"#,
        )
        .await;
        assert_eq!(next_text(&mut first).await, "40");
        send_text(&mut first, "40").await;

        // Stay connected but never ping; the client has to give up on its own.
        let (tcp, _) = listener.accept().await.unwrap();
        let _second = accept_async(tcp).await.unwrap();
        let _ = reconnected_tx.send(());
        drop(first);
    });

    let cancel = CancellationToken::new();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (handle, controller) = spawn_controller(Dashboard::default(), out_tx, cancel.clone());

    let url = format!("ws://{addr}/socket.io/?EIO=4&transport=websocket");
    let transport_task = tokio::spawn(transport::run(
        url,
        handle,
        out_rx,
        Duration::from_millis(20),
        cancel.clone(),
    ));

    tokio::time::timeout(Duration::from_secs(2), reconnected_rx)
        .await
        .expect("client reconnected after missed heartbeat")
        .unwrap();

    cancel.cancel();
    transport_task.await.unwrap();
    controller.await.unwrap();
    backend.await.unwrap();
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetches_system_info() {
    let base = serve(Router::new().route(
        "/system_info",
        get(|| async {
            Json(SystemInfo {
                hostname: "harvester".into(),
                ip: "192.168.1.20".into(),
                version: "1.0.0".into(),
            })
        }),
    ))
    .await;

    let client = reqwest::Client::new();
    let info = fetch_system_info(&client, &format!("{base}/system_info"))
        .await
        .unwrap();
    assert_eq!(info.hostname, "harvester");
    assert_eq!(info.version, "1.0.0");
}

#[tokio::test]
async fn system_info_failure_is_reported_not_fatal() {
    let base = serve(Router::new()).await;
    let client = reqwest::Client::new();
    let url = format!("{base}/system_info");

    let err = fetch_system_info(&client, &url).await.unwrap_err();
    assert!(matches!(err, InfoError::Status { status: 404, .. }));
    assert!(load_system_info(&client, &url).await.is_none());
}
