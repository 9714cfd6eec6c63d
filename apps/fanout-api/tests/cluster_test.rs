mod common;

use common::{connect, group_list, next_json, register_tenant, start_node, wait_until};

/// Two clustered nodes pointed at each other.
async fn start_pair() -> (common::TestNode, common::TestNode) {
    let n1 = start_node(true).await;
    let n2 = start_node(true).await;
    n1.peers.replace(vec![n2.base_url()]);
    n2.peers.replace(vec![n1.base_url()]);
    register_tenant(&n1, "acme").await;
    register_tenant(&n2, "acme").await;
    (n1, n2)
}

#[tokio::test]
async fn group_send_reaches_a_member_on_another_node() {
    let (n1, n2) = start_pair().await;

    let (mut ws_remote, _) = connect(&n2, "systemId=acme&groupName=lobby").await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/send/2/group", n1.base_url()))
        .json(&serde_json::json!({
            "systemId": "acme",
            "sendUserId": "backend",
            "groupName": "lobby",
            "data": "cross-node",
        }))
        .send()
        .await
        .expect("send request")
        .json()
        .await
        .expect("send response");
    assert_eq!(resp["code"], 0);

    let received = next_json(&mut ws_remote).await.expect("relayed delivery");
    assert_eq!(received["data"], "cross-node");
    assert_eq!(
        received["messageId"].as_str().unwrap(),
        resp["data"]["messageId"].as_str().unwrap(),
        "correlation id must survive the relay"
    );
}

#[tokio::test]
async fn direct_send_finds_a_client_on_another_node() {
    let (n1, n2) = start_pair().await;

    let (mut ws_remote, id_remote) = connect(&n2, "systemId=acme").await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/send/2/client", n1.base_url()))
        .json(&serde_json::json!({
            "systemId": "acme",
            "sendUserId": "backend",
            "clientId": id_remote,
            "data": "found you",
        }))
        .send()
        .await
        .expect("send request")
        .json()
        .await
        .expect("send response");
    assert_eq!(resp["code"], 0);

    let received = next_json(&mut ws_remote).await.expect("relayed delivery");
    assert_eq!(received["data"], "found you");
}

#[tokio::test]
async fn group_query_unions_both_nodes() {
    let (n1, n2) = start_pair().await;

    let (_ws_a, id_a) = connect(&n1, "systemId=acme&groupName=lobby").await;
    let (_ws_b, id_b) = connect(&n2, "systemId=acme&groupName=lobby").await;

    let mut members = group_list(&n1, "acme", "lobby").await;
    members.sort();
    let mut expected = vec![id_a, id_b];
    expected.sort();
    assert_eq!(members, expected);
}

#[tokio::test]
async fn query_survives_a_dead_peer() {
    let (n1, n2) = start_pair().await;
    // One reachable peer, one that refuses connections.
    n1.peers
        .replace(vec!["http://127.0.0.1:9".to_string(), n2.base_url()]);

    let (_ws_a, id_a) = connect(&n1, "systemId=acme&groupName=lobby").await;
    let (_ws_b, id_b) = connect(&n2, "systemId=acme&groupName=lobby").await;

    let mut members = group_list(&n1, "acme", "lobby").await;
    members.sort();
    let mut expected = vec![id_a, id_b];
    expected.sort();
    assert_eq!(members, expected, "dead peer must not poison the union");
}

#[tokio::test]
async fn bind_is_relayed_to_the_owning_node() {
    let (n1, n2) = start_pair().await;

    let (_ws_remote, id_remote) = connect(&n2, "systemId=acme").await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/bind/2/group", n1.base_url()))
        .json(&serde_json::json!({
            "systemId": "acme",
            "groupName": "ops",
            "clientId": id_remote,
        }))
        .send()
        .await
        .expect("bind request")
        .json()
        .await
        .expect("bind response");
    assert_eq!(resp["code"], 0);

    wait_until(
        || async { group_list(&n2, "acme", "ops").await == vec![id_remote.clone()] },
        "relayed bind",
    )
    .await;
}

#[tokio::test]
async fn force_close_is_relayed_to_the_owning_node() {
    let (n1, n2) = start_pair().await;

    let (mut ws_remote, id_remote) = connect(&n2, "systemId=acme").await;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/close/client", n1.base_url()))
        .json(&serde_json::json!({ "systemId": "acme", "clientId": id_remote }))
        .send()
        .await
        .expect("close request")
        .json()
        .await
        .expect("close response");
    assert_eq!(resp["code"], 0);

    assert!(
        next_json(&mut ws_remote).await.is_none(),
        "relayed close should end the socket"
    );
    wait_until(
        || async { n2.state.hub.registry.count() == 0 },
        "remote registry cleanup",
    )
    .await;
}

#[tokio::test]
async fn multi_login_notice_crosses_nodes() {
    let (n1, n2) = start_pair().await;

    let (mut ws_first, _) = connect(&n1, "systemId=acme&userId=u1").await;
    let (_ws_second, id_second) = connect(&n2, "systemId=acme&userId=u1").await;

    let notice = next_json(&mut ws_first).await.expect("multi-login notice");
    assert_eq!(notice["code"], 2000);
    assert_eq!(notice["sendUserId"], id_second);
}
