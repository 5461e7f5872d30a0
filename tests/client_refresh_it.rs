#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use console_client::{
	debug::RefreshStatus,
	error::Error,
	http::{ApiRequest, HttpMethod},
	session::SessionEndReason,
};

#[tokio::test]
async fn valid_credential_is_attached_and_no_refresh_happens() {
	let server = MockServer::start_async().await;
	let Harness { client, redirect, .. } = harness(test_config(&server.base_url()), None);
	let guilds = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/guilds/42")
				.header("authorization", "Bearer T1")
				.header("content-type", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "id": 42 }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(500);
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;

	let response = client.get("/guilds/42").await.expect("Authorized request should succeed.");

	guilds.assert_async().await;
	refresh.assert_calls_async(0).await;

	assert_eq!(response.status, 200);
	assert_eq!(response.data, json!({ "id": 42 }));
	assert_eq!(redirect.count(), 0);

	let snapshot = client.debug().snapshot();

	assert_eq!(snapshot.request_history.len(), 1);
	assert_eq!(snapshot.request_history[0].status, Some(200));
	assert!(snapshot.token_refresh_events.is_empty());
}

#[tokio::test]
async fn expired_credential_is_refreshed_once_and_the_request_retried() {
	let server = MockServer::start_async().await;
	let Harness { client, store, redirect } = harness(test_config(&server.base_url()), None);
	let expired = server
		.mock_async(|when, then| {
			when.method(POST).path("/ranks").header("authorization", "Bearer T1");
			then.status(401).json_body(json!({ "message": "token expired" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/ranks")
				.header("authorization", "Bearer T2")
				.json_body(json!({ "name": "Officer" }));
			then.status(201).json_body(json!({ "id": 7, "name": "Officer" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refresh_token": "R1" }));
			then.status(200).json_body(json!({ "access_token": "T2", "refresh_token": "R2" }));
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;

	let response = client
		.post("ranks", json!({ "name": "Officer" }))
		.await
		.expect("Request should succeed after the refresh.");

	expired.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(response.status, 201);
	assert_eq!(stored_tokens(&store), (Some("T2".into()), Some("R2".into())));
	assert_eq!(redirect.count(), 0);
	assert_eq!(client.refresh_metrics().successes(), 1);
	assert!(!client.is_refreshing());

	let snapshot = client.debug().snapshot();
	let statuses: Vec<_> = snapshot.request_history.iter().map(|entry| entry.status).collect();

	// The refresh call itself is not part of the request history.
	assert_eq!(statuses, vec![Some(201), Some(401)]);
	assert_eq!(snapshot.token_refresh_events.len(), 1);
	assert_eq!(snapshot.token_refresh_events[0].status, RefreshStatus::Success);
}

#[tokio::test]
async fn refresh_without_a_new_refresh_credential_keeps_the_old_one() {
	let server = MockServer::start_async().await;
	let Harness { client, store, .. } = harness(test_config(&server.base_url()), None);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer T1");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer T2");
			then.status(200).json_body(json!({ "name": "moderator" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "access_token": "T2" }));
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;
	client.get("me").await.expect("Request should succeed after the refresh.");

	assert_eq!(stored_tokens(&store), (Some("T2".into()), Some("R1".into())));
	assert_eq!(store.record().user, Some(json!({ "name": "moderator" })));
}

#[tokio::test]
async fn non_401_failures_pass_through_untouched() {
	let server = MockServer::start_async().await;
	let Harness { client, store, redirect } = harness(test_config(&server.base_url()), None);

	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/guilds/42/members/9");
			then.status(403).json_body(json!({ "message": "missing permission" }));
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "access_token": "T2" }));
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;

	let err = client
		.delete("/guilds/42/members/9")
		.await
		.expect_err("403 should be returned to the caller.");

	refresh.assert_calls_async(0).await;

	assert!(matches!(err, Error::Status { .. }));
	assert_eq!(err.status_code(), Some(403));
	assert_eq!(
		err.response().map(|response| response.data.clone()),
		Some(json!({ "message": "missing permission" }))
	);
	assert_eq!(stored_tokens(&store), (Some("T1".into()), Some("R1".into())));
	assert_eq!(redirect.count(), 0);

	let snapshot = client.debug().snapshot();

	assert_eq!(snapshot.request_history[0].status, Some(403));
	assert_eq!(snapshot.request_history[0].status_text.as_deref(), Some("Forbidden"));
}

#[tokio::test]
async fn missing_refresh_credential_ends_the_session_without_a_refresh_call() {
	let server = MockServer::start_async().await;
	let Harness { client, store, redirect } = harness(test_config(&server.base_url()), None);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/guilds");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "access_token": "T2" }));
		})
		.await;

	sign_in(&client, "T1", None).await;

	let err = client.get("guilds").await.expect_err("Session should end.");

	refresh.assert_calls_async(0).await;

	assert!(matches!(
		err,
		Error::SessionEnded { reason: SessionEndReason::MissingRefreshToken, .. }
	));
	assert_eq!(err.status_code(), Some(401));
	assert!(store.record().is_empty());
	assert_eq!(
		redirect.targets(),
		vec![(String::from("/login"), SessionEndReason::MissingRefreshToken)]
	);
	assert!(client.debug().snapshot().token_refresh_events.is_empty());
	assert_eq!(client.session_ended(), Some(SessionEndReason::MissingRefreshToken));
}

#[tokio::test]
async fn persistent_401_after_refresh_is_not_refreshed_again() {
	let server = MockServer::start_async().await;
	let Harness { client, redirect, .. } = harness(test_config(&server.base_url()), None);
	let guilds = server
		.mock_async(|when, then| {
			when.method(GET).path("/guilds");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "access_token": "T2", "refresh_token": "R2" }));
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;

	let err = client.get("guilds").await.expect_err("Retried 401 should surface.");

	guilds.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert!(err.is_unauthorized());
	assert_eq!(redirect.count(), 0);
	assert_eq!(client.session_ended(), None);
}

#[tokio::test]
async fn rejected_refresh_ends_the_session_with_the_backend_message() {
	let server = MockServer::start_async().await;
	let Harness { client, store, redirect } = harness(test_config(&server.base_url()), None);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/ranks");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(400).json_body(json!({ "message": "refresh token revoked" }));
		})
		.await;

	sign_in(&client, "T1", Some("R1")).await;

	let err = client
		.send(ApiRequest::new(HttpMethod::Get, "/ranks").header("X-Guild", "42"))
		.await
		.expect_err("Rejected refresh should end the session.");
	let expected =
		SessionEndReason::RefreshRejected { status: 400, message: "refresh token revoked".into() };

	assert!(matches!(&err, Error::SessionEnded { reason, .. } if *reason == expected));
	assert_eq!(err.status_code(), Some(401));
	assert!(store.record().is_empty());
	assert_eq!(redirect.count(), 1);
	assert_eq!(client.refresh_metrics().failures(), 1);

	let snapshot = client.debug().snapshot();

	assert_eq!(snapshot.token_refresh_events[0].status, RefreshStatus::Failure);
	assert_eq!(
		snapshot.token_refresh_events[0].message.as_deref(),
		Some("refresh rejected with status 400: refresh token revoked")
	);
}

#[tokio::test]
async fn absolute_targets_bypass_the_base_url() {
	let api = MockServer::start_async().await;
	let cdn = MockServer::start_async().await;
	let Harness { client, .. } = harness(test_config(&api.base_url()), None);
	let avatar = cdn
		.mock_async(|when, then| {
			when.method(GET).path("/avatars/9.json");
			then.status(200).json_body(json!({ "url": "/9.png" }));
		})
		.await;

	client.get(&cdn.url("/avatars/9.json")).await.expect("Absolute target should be fetched.");

	avatar.assert_async().await;
}
