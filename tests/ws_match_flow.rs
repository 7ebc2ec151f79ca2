mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(socket: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(10), socket.next())
            .await
            .expect("message within the deadline")
            .expect("stream still open")
            .expect("websocket receive succeeds");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sends valid json");
        }
    }
}

// Read messages until the extractor produces a value or the deadline passes.
async fn wait_for<T>(
    socket: &mut WsStream,
    deadline: Duration,
    mut extract: impl FnMut(&Value) -> Option<T>,
) -> T {
    let result = tokio::time::timeout(deadline, async {
        loop {
            let msg = next_json(socket).await;
            if let Some(value) = extract(&msg) {
                return value;
            }
        }
    })
    .await;
    result.expect("expected message within the deadline")
}

async fn connect(base_url: &str, match_id: &str) -> WsStream {
    let ws_url = format!(
        "{}/ws?match_id={}",
        base_url.replace("http://", "ws://"),
        match_id
    );
    let (socket, _) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("ws connect");
    socket
}

#[tokio::test]
async fn typing_a_spawned_word_scores_a_kill() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let match_id = format!("flow-{}", uuid::Uuid::new_v4());

    let res = client
        .post(format!("{base_url}/matches"))
        .json(&json!({ "match_id": match_id }))
        .send()
        .await
        .expect("create match");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let mut socket = connect(base_url, &match_id).await;

    // The identity message always arrives first.
    let identity = next_json(&mut socket).await;
    assert_eq!(identity["type"], "Identity");
    assert_eq!(identity["data"]["match_id"], match_id.as_str());

    socket
        .send(Message::text(json!({"type": "Start"}).to_string()))
        .await
        .expect("send start");

    // Wait for the first enemy to appear in a snapshot.
    let word = wait_for(&mut socket, Duration::from_secs(10), |msg| {
        if msg["type"] != "Snapshot" {
            return None;
        }
        msg["data"]["enemies"][0]["word"].as_str().map(str::to_string)
    })
    .await;

    socket
        .send(Message::text(
            json!({"type": "Input", "data": {"text": word}}).to_string(),
        ))
        .await
        .expect("send the full word");

    // The kill surfaces as a score notice and a scored snapshot.
    wait_for(&mut socket, Duration::from_secs(5), |msg| {
        match msg["type"].as_str() {
            Some("Notice") if msg["data"]["type"] == "ScoreUpdate" => Some(()),
            Some("Snapshot") if msg["data"]["score"].as_u64().unwrap_or(0) > 0 => Some(()),
            _ => None,
        }
    })
    .await;
}

#[tokio::test]
async fn an_unknown_match_id_is_rejected() {
    let base_url = support::ensure_server();
    let ws_url = format!(
        "{}/ws?match_id=no-such-match",
        base_url.replace("http://", "ws://")
    );
    let err = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect_err("upgrade should fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 404);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
