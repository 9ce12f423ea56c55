//! Response strategy hooks that classify non-success API responses.
//!
//! Implementations see only crate-owned data (status, diagnostics, body preview) so they stay
//! independent of the HTTP client.

// crates.io
use oauth2::HttpResponse;
// self
use crate::{_prelude::*, error::AuthError, http, obs::CallKind};

/// Diagnostics text the FHIR API returns for a patch that would not change the resource.
pub const NO_CHANGES_DIAGNOSTICS: &str = "Provided patch made no changes to the resource";

/// Strategy hook that classifies failed API responses.
///
/// Implementors are required to be `Send + Sync` so clients can share them across load
/// sessions.
pub trait ResponseStrategy: Send + Sync {
	/// Maps a non-success response into the crate's failure categories.
	fn classify(&self, ctx: &ResponseErrorContext) -> ResponseErrorKind;
}

/// Canonical response failure categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseErrorKind {
	/// Resource does not exist.
	NotFound,
	/// Credential was refused.
	Unauthorized,
	/// Conditional write carried a stale version token.
	PreconditionFailed,
	/// Patch would not change the resource.
	NoChanges,
	/// Upstream throttled the caller.
	RateLimited,
	/// Upstream is temporarily unavailable.
	Unavailable,
	/// Any other refusal.
	Rejected,
}

/// Context passed to response strategies when classifying failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseErrorContext {
	/// Operation that produced the response.
	pub call: CallKind,
	/// HTTP status code.
	pub status: u16,
	/// First `issue[].diagnostics` entry of an `OperationOutcome` body, if present.
	pub diagnostics: Option<String>,
	/// Truncated response body.
	pub body_preview: Option<String>,
	/// Parsed `Retry-After` hint.
	pub retry_after: Option<Duration>,
}
impl ResponseErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a context carrying only the call and status.
	pub fn new(call: CallKind, status: u16) -> Self {
		Self { call, status, diagnostics: None, body_preview: None, retry_after: None }
	}

	/// Extracts status, diagnostics, body preview, and retry hint from a response.
	pub fn from_response(call: CallKind, response: &HttpResponse) -> Self {
		let body = String::from_utf8_lossy(response.body()).into_owned();
		let mut ctx = Self::new(call, response.status().as_u16());

		if let Some(diagnostics) = first_diagnostics(response.body()) {
			ctx = ctx.with_diagnostics(diagnostics);
		}
		if let Some(retry_after) = http::parse_retry_after(response.headers()) {
			ctx = ctx.with_retry_after(retry_after);
		}
		if !body.trim().is_empty() {
			ctx = ctx.with_body_preview(body);
		}

		ctx
	}

	/// Adds `OperationOutcome` diagnostics text.
	pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
		self.diagnostics = Some(diagnostics.into());

		self
	}

	/// Adds a body preview, truncated to a bounded length.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Adds a retry hint.
	pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
		self.retry_after = Some(retry_after);

		self
	}

	/// Builds the crate error for `kind`, naming `resource` and the version token that was sent.
	pub fn into_error(self, kind: ResponseErrorKind, resource: &str, etag: Option<&str>) -> Error {
		match kind {
			ResponseErrorKind::NotFound => Error::NotFound { resource: resource.into() },
			ResponseErrorKind::Unauthorized => AuthError::Rejected { status: self.status }.into(),
			ResponseErrorKind::PreconditionFailed => Error::Conflict {
				resource: resource.into(),
				etag: etag.unwrap_or_default().into(),
			},
			ResponseErrorKind::NoChanges => Error::NoChanges { resource: resource.into() },
			ResponseErrorKind::RateLimited => Error::RateLimited { retry_after: self.retry_after },
			ResponseErrorKind::Unavailable => Error::Unavailable { status: self.status },
			ResponseErrorKind::Rejected => Error::Rejected {
				status: self.status,
				body_preview: self.body_preview.unwrap_or_default(),
			},
		}
	}
}

/// Default strategy following the FHIR API's status conventions.
///
/// Structured diagnostics are consulted first (the no-op patch case), then the status code.
#[derive(Debug, Default)]
pub struct DefaultResponseStrategy;
impl Display for DefaultResponseStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-response-strategy")
	}
}
impl ResponseStrategy for DefaultResponseStrategy {
	fn classify(&self, ctx: &ResponseErrorContext) -> ResponseErrorKind {
		if ctx.status == 400
			&& ctx.diagnostics.as_deref().is_some_and(|text| text.contains(NO_CHANGES_DIAGNOSTICS))
		{
			return ResponseErrorKind::NoChanges;
		}

		classify_status(ctx.status)
	}
}

fn classify_status(status: u16) -> ResponseErrorKind {
	match status {
		401 | 403 => ResponseErrorKind::Unauthorized,
		404 => ResponseErrorKind::NotFound,
		412 => ResponseErrorKind::PreconditionFailed,
		429 => ResponseErrorKind::RateLimited,
		503 => ResponseErrorKind::Unavailable,
		_ => ResponseErrorKind::Rejected,
	}
}

#[derive(Deserialize)]
struct OperationOutcome {
	#[serde(default)]
	issue: Vec<OperationOutcomeIssue>,
}

#[derive(Deserialize)]
struct OperationOutcomeIssue {
	diagnostics: Option<String>,
}

fn first_diagnostics(body: &[u8]) -> Option<String> {
	let outcome = serde_json::from_slice::<OperationOutcome>(body).ok()?;

	outcome.issue.into_iter().next().and_then(|issue| issue.diagnostics)
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ResponseErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ResponseErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status fixture should be valid.");

		response
	}

	#[test]
	fn no_op_patch_diagnostics_are_recognised() {
		let body = r#"{"resourceType":"OperationOutcome","issue":[{"severity":"error","code":"structure","diagnostics":"Invalid update with error - Provided patch made no changes to the resource"}]}"#;
		let ctx = ResponseErrorContext::from_response(CallKind::Write, &response(400, body));

		assert_eq!(DefaultResponseStrategy.classify(&ctx), ResponseErrorKind::NoChanges);
	}

	#[test]
	fn only_the_first_issue_is_consulted() {
		let body = r#"{"issue":[{"severity":"error"},{"diagnostics":"Provided patch made no changes to the resource"}]}"#;
		let ctx = ResponseErrorContext::from_response(CallKind::Write, &response(400, body));

		assert_eq!(ctx.diagnostics, None);
		assert_eq!(DefaultResponseStrategy.classify(&ctx), ResponseErrorKind::Rejected);
	}

	#[test]
	fn retry_hint_is_carried_into_rate_limit_errors() {
		let mut response = response(429, "");

		response.headers_mut().insert(
			oauth2::http::header::RETRY_AFTER,
			oauth2::http::HeaderValue::from_static("7"),
		);

		let ctx = ResponseErrorContext::from_response(CallKind::StatusRead, &response);

		assert_eq!(ctx.retry_after, Some(Duration::seconds(7)));
		assert_eq!(ctx.body_preview, None);
		assert!(matches!(
			ctx.into_error(ResponseErrorKind::RateLimited, "suspended-patient-status/9692295966", None),
			Error::RateLimited { retry_after: Some(hint) } if hint == Duration::seconds(7)
		));
	}

	#[test]
	fn other_bad_requests_are_rejections() {
		let body = r#"{"issue":[{"diagnostics":"Invalid patch - can't replace non-existent object"}]}"#;
		let ctx = ResponseErrorContext::from_response(CallKind::Write, &response(400, body));

		assert_eq!(DefaultResponseStrategy.classify(&ctx), ResponseErrorKind::Rejected);

		let err = ctx.into_error(ResponseErrorKind::Rejected, "Patient/9692295966", None);

		assert!(matches!(err, Error::Rejected { status: 400, ref body_preview } if body_preview.contains("non-existent")));
	}

	#[test]
	fn statuses_map_to_failure_categories() {
		let cases = [
			(401, ResponseErrorKind::Unauthorized),
			(403, ResponseErrorKind::Unauthorized),
			(404, ResponseErrorKind::NotFound),
			(412, ResponseErrorKind::PreconditionFailed),
			(429, ResponseErrorKind::RateLimited),
			(503, ResponseErrorKind::Unavailable),
			(500, ResponseErrorKind::Rejected),
		];

		for (status, expected) in cases {
			let ctx = ResponseErrorContext::new(CallKind::Read, status);

			assert_eq!(DefaultResponseStrategy.classify(&ctx), expected, "status {status}");
		}
	}

	#[test]
	fn precondition_failure_names_the_stale_token() {
		let err = ResponseErrorContext::new(CallKind::Write, 412).into_error(
			ResponseErrorKind::PreconditionFailed,
			"Patient/9692295966",
			Some("W/123"),
		);

		assert!(matches!(err, Error::Conflict { ref etag, .. } if etag == "W/123"));
	}

	#[test]
	fn long_bodies_are_truncated() {
		let ctx = ResponseErrorContext::new(CallKind::Read, 500).with_body_preview("x".repeat(1_000));
		let preview = ctx.body_preview.expect("Preview should be present.");

		assert_eq!(preview.chars().count(), ResponseErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
