//! Command-line entry point for the spike workflow and the load driver.

// std
use std::{fs, path::Path};
// crates.io
use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::WrapErr};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use pds_spike::{
	auth::{AssertionSigner, ResourceType},
	config::{LoadTestConfig, SpikeConfig},
	error::ConfigError,
	flows::{ReqwestAssertionFlow, SharedSecretFlow, TokenIssuer},
	load::{IdentifierPool, ReqwestLoadTest, ReqwestStatusClient, SessionOutcome},
	resource::{PatchBatch, ReqwestResourceClient},
	store::FileStore,
};

const LAST_GET_ARTIFACT: &str = "last_get.json";
const LAST_PATCH_ARTIFACT: &str = "last_patch.json";

#[derive(Debug, Parser)]
#[command(name = "pds-spike", version, about = "FHIR patient record auth spike and load driver")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Read the configured patient and save the body to `last_get.json`.
	GetPatient,
	/// Set the patient's managing organisation, guarded by the ETag from a fresh read.
	SetPatientMof {
		/// ODS code of the new managing organisation.
		#[arg(long)]
		ods_code: String,
	},
	/// Run concurrent virtual users against the suspended-patient-status endpoint.
	LoadTest {
		/// Concurrent sessions to start.
		#[arg(long, default_value_t = 10)]
		users: usize,
		/// Iterations per session.
		#[arg(long, default_value_t = 5)]
		iterations: usize,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	dotenvy::dotenv().ok();
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pds_spike=info")),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	match Cli::parse().command {
		Command::GetPatient => get_patient().await,
		Command::SetPatientMof { ods_code } => set_patient_mof(&ods_code).await,
		Command::LoadTest { users, iterations } => load_test(users, iterations).await,
	}
}

async fn patient_client(config: &SpikeConfig) -> Result<ReqwestResourceClient> {
	let signer = AssertionSigner::from_key_file(&config.private_key_path, config.key_id.clone())?;
	let flow = ReqwestAssertionFlow::new(
		config.descriptor.clone(),
		config.client_id.clone(),
		signer,
		config.request_timeout,
	)?;
	let credential = flow.issue().await.wrap_err("Token exchange failed")?;

	tracing::info!("access token issued");

	Ok(ReqwestResourceClient::new(
		config.descriptor.clone(),
		ResourceType::new("Patient")?,
		credential,
		config.request_timeout,
	)?)
}

async fn get_patient() -> Result<()> {
	let config = SpikeConfig::from_env()?;
	let client = patient_client(&config).await?;
	let record = client
		.read_patient(&config.nhs_number)
		.await
		.wrap_err("Patient read failed")?;

	write_artifact(LAST_GET_ARTIFACT, &record.body)?;

	let status = record.status();
	let trace = record.trace_information();

	tracing::info!(
		etag = record.concurrency_token.value(),
		suspended = ?status.is_suspended,
		deceased = status.is_deceased,
		ods_code = status.current_ods_code.as_deref(),
		has_usual_name = trace.family_name.is_some(),
		has_home_postcode = trace.postal_code.is_some(),
		"patient read"
	);

	Ok(())
}

async fn set_patient_mof(ods_code: &str) -> Result<()> {
	let config = SpikeConfig::from_env()?;
	let client = patient_client(&config).await?;
	let read = client.read(&config.nhs_number).await?;

	tracing::info!(etag = read.concurrency_token.value(), "patient read");

	let patch = PatchBatch::managing_organization(ods_code);
	let (body, outcome) =
		client.write_capturing_body(&config.nhs_number, &read.concurrency_token, &patch).await;

	if let Some(body) = &body {
		write_artifact(LAST_PATCH_ARTIFACT, body)?;
	}

	let outcome = outcome.wrap_err("Managing organisation update failed")?;

	tracing::info!(
		status = outcome.status,
		etag = outcome.concurrency_token.as_ref().map(|token| token.value()),
		"patient patched"
	);

	Ok(())
}

async fn load_test(users: usize, iterations: usize) -> Result<()> {
	let mut config = LoadTestConfig::from_env()?;
	let secrets_file =
		config.secrets_file.clone().ok_or(ConfigError::MissingVariable { name: "SECRETS_FILE" })?;
	let store = FileStore::open(secrets_file)?;
	let issuer =
		SharedSecretFlow::<FileStore>::new(store, &config.environment, config.username.clone());
	let client = ReqwestStatusClient::new(config.descriptor.clone(), config.request_timeout)?;

	config.plan.iterations = iterations;

	let driver = ReqwestLoadTest::<SharedSecretFlow<FileStore>>::new(
		client,
		IdentifierPool::new(config.nhs_numbers.clone()),
		issuer,
		config.plan.clone(),
	);

	tracing::info!(users, iterations, pool = config.nhs_numbers.len(), "load test starting");

	let report = driver.run(users).await;

	for session in &report.sessions {
		match &session.outcome {
			SessionOutcome::Completed { id, stats } => tracing::info!(
				session = session.session,
				id = %id,
				reads = stats.reads,
				writes = stats.writes,
				failures = stats.failures.len(),
				"session completed"
			),
			SessionOutcome::StartFailed(e) =>
				tracing::warn!(session = session.session, error = %e, "session failed to start"),
			SessionOutcome::Aborted { message } =>
				tracing::error!(session = session.session, reason = %message, "session aborted"),
		}
	}

	tracing::info!(
		started = report.started(),
		start_failures = report.start_failures(),
		reads = report.reads(),
		writes = report.writes(),
		call_failures = report.call_failures(),
		"load test finished"
	);

	Ok(())
}

fn write_artifact(path: impl AsRef<Path>, body: &serde_json::Value) -> Result<()> {
	let path = path.as_ref();

	fs::write(path, serde_json::to_vec_pretty(body)?)
		.wrap_err_with(|| format!("Failed to write {}", path.display()))?;

	tracing::info!(artifact = %path.display(), "artifact written");

	Ok(())
}
