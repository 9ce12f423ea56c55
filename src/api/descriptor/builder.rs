// crates.io
use url::Host;
// self
use crate::{_prelude::*, api::ApiDescriptor};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ApiDescriptorError {
	/// Base URL is mandatory.
	#[error("Missing base URL.")]
	MissingBaseUrl,
	/// Token endpoint is required by the client-assertion exchange.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The URL cannot have paths joined onto it.
	#[error("The {endpoint} endpoint cannot be used as a base: {url}.")]
	NotABase {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug, Default)]
pub struct ApiDescriptorBuilder {
	/// Base URL for resource paths.
	pub base_url: Option<Url>,
	/// Optional token endpoint.
	pub token_endpoint: Option<Url>,
}
impl ApiDescriptorBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let mut base_url = self.base_url.ok_or(ApiDescriptorError::MissingBaseUrl)?;

		if base_url.cannot_be_a_base() {
			return Err(ApiDescriptorError::NotABase { endpoint: "base", url: base_url.to_string() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let descriptor = ApiDescriptor { base_url, token_endpoint: self.token_endpoint };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ApiDescriptorError> {
		validate_endpoint("base", &self.base_url)?;

		if let Some(token) = self.token_endpoint.as_ref() {
			validate_endpoint("token", token)?;
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ApiDescriptorError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(ApiDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse.")
	}

	#[test]
	fn plain_http_is_rejected_for_remote_hosts() {
		let err = ApiDescriptor::builder()
			.base_url(url("http://int.api.service.nhs.uk/personal-demographics/FHIR/R4/"))
			.build()
			.expect_err("Remote plain HTTP should be rejected.");

		assert!(matches!(err, ApiDescriptorError::InsecureEndpoint { endpoint: "base", .. }));

		let err = ApiDescriptor::builder()
			.base_url(url("https://int.api.service.nhs.uk/"))
			.token_endpoint(url("http://int.api.service.nhs.uk/oauth2/token"))
			.build()
			.expect_err("Remote plain HTTP token endpoint should be rejected.");

		assert!(matches!(err, ApiDescriptorError::InsecureEndpoint { endpoint: "token", .. }));
	}

	#[test]
	fn loopback_hosts_may_use_plain_http() {
		let descriptor = ApiDescriptor::builder()
			.base_url(url("http://127.0.0.1:8080/FHIR/R4"))
			.token_endpoint(url("http://localhost:8080/oauth2/token"))
			.build()
			.expect("Loopback endpoints should be accepted.");

		assert_eq!(descriptor.base_url.as_str(), "http://127.0.0.1:8080/FHIR/R4/");
	}

	#[test]
	fn base_url_is_required() {
		assert_eq!(ApiDescriptor::builder().build(), Err(ApiDescriptorError::MissingBaseUrl));
	}
}
