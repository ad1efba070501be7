use std::{net::SocketAddr, sync::Arc};

use axum::{Json, Router, extract::State, routing::post};
use parking_lot::Mutex;
use serde_json::{Value, json};

use kea_client::{Address, ClientOptions, connect};
use kea_stats::Family;

/// fake control agent with a dhcp4 and a dhcp6 daemon behind it
#[derive(Default)]
struct Agent {
    requests: Mutex<Vec<Value>>,
}

async fn handle(State(agent): State<Arc<Agent>>, Json(request): Json<Value>) -> Json<Value> {
    agent.requests.lock().push(request.clone());
    let reply = match (request["command"].as_str(), request.get("service")) {
        (Some("config-get"), None) => json!([{"result": 0, "arguments": {"Control-agent": {
            "http-host": "127.0.0.1",
            "control-sockets": {
                "dhcp4": {"socket-type": "unix", "socket-name": "/run/kea/kea4-ctrl-socket"},
                "dhcp6": {"socket-type": "unix", "socket-name": "/run/kea/kea6-ctrl-socket"}
            }
        }}}]),
        (Some("config-get"), Some(_)) => json!([
            {"result": 0, "arguments": {"Dhcp4": {"subnet4": [
                {"id": 1, "subnet": "192.0.2.0/24", "pools": [{"pool": "192.0.2.10-192.0.2.20"}]}
            ]}}},
            {"result": 0, "arguments": {"Dhcp6": {"shared-networks": [{"name": "lab", "subnet6": [
                {"id": 7, "subnet": "2001:db8::/64"}
            ]}]}}}
        ]),
        (Some("statistic-get-all"), _) => json!([
            {"result": 0, "arguments": {
                "pkt4-ack-sent": [[12, "2024-05-01 12:00:01.000000"], [10, "2024-05-01 12:00:00.000000"]],
                "subnet[1].pool[0].assigned-addresses": [[3, "2024-05-01 12:00:01.000000"]]
            }},
            {"result": 0, "arguments": {
                "subnet[7].assigned-nas": [[1, "2024-05-01 12:00:01.000000"]]
            }}
        ]),
        _ => json!([{"result": 2, "text": "'unknown' command not supported."}]),
    };
    Json(reply)
}

async fn spawn_agent() -> (SocketAddr, Arc<Agent>) {
    let agent = Arc::new(Agent::default());
    let app = Router::new()
        .route("/", post(handle))
        .with_state(Arc::clone(&agent));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (addr, agent)
}

#[tokio::test]
async fn polls_control_agent_over_http() {
    let (addr, agent) = spawn_agent().await;
    let address: Address = format!("http://{addr}/").parse().unwrap();
    let mut target = connect(&address, &ClientOptions::default()).unwrap();

    let configs = target.refresh_config().await.unwrap();
    assert_eq!(
        configs.iter().map(|c| c.family).collect::<Vec<_>>(),
        [Family::Dhcp4, Family::Dhcp6]
    );
    assert_eq!(configs[1].subnets[0].id, 7);
    assert_eq!(configs[1].subnets[0].label, "2001:db8::/64");

    let stats = target.statistics().await.unwrap();
    assert_eq!(stats.len(), 2);
    let v4 = stats[0].statistics.iter().collect::<Vec<_>>();
    assert_eq!(v4[0].key, "pkt4-ack-sent");
    // newest history entry wins
    assert_eq!(v4[0].value, 12.0);
    assert_eq!(stats[1].family, Family::Dhcp6);

    let requests = agent.requests.lock().clone();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2]["service"], json!(["dhcp4", "dhcp6"]));
}

#[tokio::test]
async fn unreachable_agent_is_an_http_error() {
    // bind then drop to get a port nobody listens on
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let address: Address = format!("http://{addr}/").parse().unwrap();
    let mut target = connect(&address, &ClientOptions::default()).unwrap();

    let err = target.refresh_config().await.unwrap_err();
    assert!(matches!(err, kea_client::ClientError::Http(_)), "{err}");
}

#[test]
fn missing_socket_target_rejected() {
    let address: Address = "/nonexistent/kea-ctrl-socket".parse().unwrap();
    assert!(connect(&address, &ClientOptions::default()).is_err());
}
