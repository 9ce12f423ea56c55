// std
use std::collections::HashSet;
// crates.io
use httpmock::prelude::*;
// self
use pds_spike::{
	_preludet::*,
	api::ApiDescriptor,
	auth::{Credential, ResourceId, TokenSecret},
	flows::{DEFAULT_ADAPTOR_USERNAME, SharedSecretFlow},
	load::{
		IdentifierPool, ReqwestLoadTest, ReqwestStatusClient, SessionAuth, SessionOutcome,
		SessionPlan, StartError, ThinkTime, WorkloadMix,
	},
	store::{MemoryStore, SecretPath},
	transport::ReqwestTransportErrorMapper,
};

const NHS_NUMBERS: [&str; 3] = ["9693632109", "9693632117", "9693632125"];
// base64("e2e-test:p4ss")
const BASIC_AUTH: &str = "Basic ZTJlLXRlc3Q6cDRzcw==";

fn build_client(server: &MockServer) -> ReqwestStatusClient {
	let descriptor = ApiDescriptor::builder()
		.base_url(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
		.build()
		.expect("Descriptor should build for loopback endpoints.");

	ReqwestStatusClient::with_http_client(
		descriptor,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
}

fn pool() -> IdentifierPool {
	IdentifierPool::new(
		NHS_NUMBERS.iter().map(|id| ResourceId::new(id).expect("NHS number fixture should be valid.")),
	)
}

fn plan(iterations: usize) -> SessionPlan {
	SessionPlan {
		iterations,
		think_time: ThinkTime::none(),
		mix: WorkloadMix::new(1.0).expect("Write ratio fixture should be valid."),
		previous_gp: Some("B86041".into()),
	}
}

#[tokio::test]
async fn sessions_beyond_the_pool_fail_to_start_without_affecting_others() {
	let server = MockServer::start_async().await;
	let mut reads = Vec::new();
	let mut writes = Vec::new();

	for nhs_number in NHS_NUMBERS {
		let path = format!("/suspended-patient-status/{nhs_number}");
		let body = format!(
			"{{\"nhsNumber\":\"{nhs_number}\",\"isSuspended\":true,\"currentOdsCode\":null,\"managingOrganisation\":\"B86041\",\"recordETag\":\"W/\\\"3\\\"\",\"isDeceased\":false}}"
		);

		reads.push(
			server
				.mock_async(|when, then| {
					when.method(GET)
						.path(path.clone())
						.header("authorization", BASIC_AUTH)
						.header_exists("traceid");
					then.status(200).header("content-type", "application/json").body(body.clone());
				})
				.await,
		);
		writes.push(
			server
				.mock_async(|when, then| {
					when.method(PUT)
						.path(path.clone())
						.header("authorization", BASIC_AUTH)
						.header("content-type", "application/json")
						.header_exists("traceid")
						.json_body(serde_json::json!({
							"previousGp": "B86041",
							"recordETag": "W/\"3\"",
						}));
					then.status(200).header("content-type", "application/json").body(body);
				})
				.await,
		);
	}

	let store = MemoryStore::default()
		.with_secret(SecretPath::adaptor_api_key("dev", DEFAULT_ADAPTOR_USERNAME), "p4ss");
	let issuer =
		SharedSecretFlow::<MemoryStore>::new(store.clone(), "dev", DEFAULT_ADAPTOR_USERNAME);
	let driver = ReqwestLoadTest::<SharedSecretFlow<MemoryStore>>::new(
		build_client(&server),
		pool(),
		issuer,
		plan(2),
	);
	let report = driver.run(5).await;

	assert_eq!(report.sessions.len(), 5);
	assert_eq!(report.started(), 3);
	assert_eq!(report.start_failures(), 2);
	assert_eq!(report.reads(), 6);
	assert_eq!(report.writes(), 6);
	assert_eq!(report.call_failures(), 0);
	assert_eq!(store.fetch_count(), 3);

	let ids = report
		.sessions
		.iter()
		.filter_map(|session| match &session.outcome {
			SessionOutcome::Completed { id, .. } => Some(id.to_string()),
			_ => None,
		})
		.collect::<HashSet<_>>();

	assert_eq!(ids, NHS_NUMBERS.iter().map(|id| id.to_string()).collect::<HashSet<_>>());
	assert!(report.sessions.iter().filter(|session| session.stats().is_none()).all(|session| {
		matches!(session.outcome, SessionOutcome::StartFailed(StartError::PoolExhausted(_)))
	}));

	for mock in reads.iter().chain(writes.iter()) {
		mock.assert_calls_async(2).await;
	}
}

#[tokio::test]
async fn missing_secret_stops_every_session_before_any_call() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET);
			then.status(200);
		})
		.await;
	let issuer = SharedSecretFlow::<MemoryStore>::new(
		MemoryStore::default(),
		"dev",
		DEFAULT_ADAPTOR_USERNAME,
	);
	let driver = ReqwestLoadTest::<SharedSecretFlow<MemoryStore>>::new(
		build_client(&server),
		pool(),
		issuer,
		plan(1),
	);
	let report = driver.run(3).await;

	mock.assert_calls_async(0).await;

	assert_eq!(report.started(), 0);
	assert_eq!(report.start_failures(), 3);
	assert!(report.sessions.iter().all(|session| {
		matches!(session.outcome, SessionOutcome::StartFailed(StartError::Credential(_)))
	}));
}

#[tokio::test]
async fn failed_reads_are_recorded_and_the_loop_continues() {
	let server = MockServer::start_async().await;
	let read = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/suspended-patient-status/{}", NHS_NUMBERS[0]));
			then.status(503);
		})
		.await;
	let store = MemoryStore::default()
		.with_secret(SecretPath::adaptor_api_key("dev", DEFAULT_ADAPTOR_USERNAME), "p4ss");
	let issuer = SharedSecretFlow::<MemoryStore>::new(store, "dev", DEFAULT_ADAPTOR_USERNAME);
	let driver = ReqwestLoadTest::<SharedSecretFlow<MemoryStore>>::new(
		build_client(&server),
		pool(),
		issuer,
		plan(3),
	);
	let report = driver.run(1).await;

	read.assert_calls_async(3).await;

	let stats = report.sessions[0].stats().expect("Session should have started.");

	assert_eq!(stats.reads, 0);
	assert_eq!(stats.writes, 0);
	assert_eq!(stats.failures.len(), 3);
	assert!(stats.failures[0].message.contains("503"));
}

#[tokio::test]
async fn trace_information_is_read_from_the_adaptor() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(format!("/patient-trace-information/{}", NHS_NUMBERS[0]))
				.header("authorization", BASIC_AUTH)
				.header_exists("traceid");
			then.status(200).header("content-type", "application/json").body(
				"{\"nhsNumber\":\"9693632109\",\"givenName\":[\"Jane\"],\"familyName\":\"Smith\",\"birthdate\":\"1984-03-02\",\"postalCode\":\"DN17 3HT\"}",
			);
		})
		.await;
	let auth = SessionAuth::new(
		Credential::basic(DEFAULT_ADAPTOR_USERNAME, TokenSecret::new("p4ss")),
		"trace-0",
	);
	let trace = build_client(&server)
		.trace_information(
			&auth,
			&ResourceId::new(NHS_NUMBERS[0]).expect("NHS number fixture should be valid."),
		)
		.await
		.expect("Trace read should succeed.");

	mock.assert_async().await;

	assert_eq!(trace.nhs_number, NHS_NUMBERS[0]);
	assert_eq!(trace.given_name, Some(vec!["Jane".to_owned()]));
	assert_eq!(trace.postal_code.as_deref(), Some("DN17 3HT"));
}
