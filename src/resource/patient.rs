//! Patient record view and the suspension and trace views derived from it.

// crates.io
use time::{Date, macros::format_description};
// self
use crate::_prelude::*;

/// Subset of a FHIR `Patient` resource needed to derive suspension status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
	/// NHS number.
	pub id: String,
	/// Registered general practices, most relevant first.
	#[serde(default)]
	pub general_practitioner: Vec<Reference>,
	/// Organisation currently managing the record.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub managing_organization: Option<Reference>,
	/// Date of death, if recorded.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deceased_date_time: Option<String>,
	/// Date of birth as sent by the API (`YYYY-MM-DD`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub birth_date: Option<String>,
	/// Recorded names, historic ones included.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub name: Vec<HumanName>,
	/// Recorded addresses, historic ones included.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub address: Vec<Address>,
}
impl Patient {
	/// First `usual` name whose period covers `today`.
	pub fn current_usual_name(&self, today: Date) -> Option<&HumanName> {
		self.name.iter().find(|name| {
			name.use_.as_deref().is_some_and(|use_| use_.eq_ignore_ascii_case("usual"))
				&& name.period.as_ref().is_some_and(|period| period.is_current_on(today))
		})
	}

	/// First `home` address whose period covers `today`.
	pub fn current_home_address(&self, today: Date) -> Option<&Address> {
		self.address.iter().find(|address| {
			address.use_.as_deref() == Some("home")
				&& address.period.as_ref().is_some_and(|period| period.is_current_on(today))
		})
	}

	/// Trace view as of today (UTC).
	pub fn trace_information(&self) -> PatientTraceInformation {
		self.trace_information_on(OffsetDateTime::now_utc().date())
	}

	/// Trace view built from the current usual name and current home address on `today`.
	pub fn trace_information_on(&self, today: Date) -> PatientTraceInformation {
		let name = self.current_usual_name(today);

		PatientTraceInformation {
			nhs_number: self.id.clone(),
			given_name: name.map(|name| name.given.clone()),
			family_name: name.and_then(|name| name.family.clone()),
			birthdate: self.birth_date.clone(),
			postal_code: self
				.current_home_address(today)
				.and_then(|address| address.postal_code.clone()),
		}
	}

	/// Derives the adaptor's status view, tagging it with `record_etag`.
	///
	/// A deceased patient is neither suspended nor active. A patient with a registered GP is
	/// active at that practice. Anyone else is suspended.
	pub fn suspended_status(&self, record_etag: impl Into<String>) -> SuspendedPatientStatus {
		let record_etag = Some(record_etag.into());
		let managing_organisation = self.managing_organization.as_ref().and_then(Reference::code);

		if self.deceased_date_time.is_some() {
			return SuspendedPatientStatus {
				nhs_number: self.id.clone(),
				is_suspended: None,
				current_ods_code: None,
				managing_organisation: None,
				record_etag,
				is_deceased: true,
			};
		}

		match self.general_practitioner.first() {
			Some(gp) => SuspendedPatientStatus {
				nhs_number: self.id.clone(),
				is_suspended: Some(false),
				current_ods_code: gp.code(),
				managing_organisation,
				record_etag,
				is_deceased: false,
			},
			None => SuspendedPatientStatus {
				nhs_number: self.id.clone(),
				is_suspended: Some(true),
				current_ods_code: None,
				managing_organisation,
				record_etag,
				is_deceased: false,
			},
		}
	}
}

/// Reference to an organisation by identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
	/// Identifier of the referenced organisation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identifier: Option<Identifier>,
}
impl Reference {
	/// ODS code carried by the identifier.
	pub fn code(&self) -> Option<String> {
		self.identifier.as_ref().map(|identifier| identifier.value.clone())
	}
}

/// FHIR identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
	/// Naming system.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub system: Option<String>,
	/// Identifier value.
	pub value: String,
}

/// FHIR `HumanName`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanName {
	/// `usual`, `official`, `nickname`, ...
	#[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
	pub use_: Option<String>,
	/// Validity window.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub period: Option<Period>,
	/// Given names in order.
	#[serde(default)]
	pub given: Vec<String>,
	/// Family name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub family: Option<String>,
}

/// FHIR `Address`, reduced to what tracing needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
	/// `home`, `temp`, `billing`, ...
	#[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
	pub use_: Option<String>,
	/// Validity window.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub period: Option<Period>,
	/// Postcode.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub postal_code: Option<String>,
}

/// FHIR `Period` with `YYYY-MM-DD` bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
	/// First day of validity.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start: Option<String>,
	/// Last day of validity; open-ended when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end: Option<String>,
}
impl Period {
	/// `true` when `start` is before `today` and `end` is absent or after it.
	///
	/// A missing or unparseable `start` never counts as current.
	pub fn is_current_on(&self, today: Date) -> bool {
		let Some(start) = self.start.as_deref().and_then(parse_date) else {
			return false;
		};

		start < today
			&& match self.end.as_deref() {
				None => true,
				Some(end) => parse_date(end).is_some_and(|end| end > today),
			}
	}
}

fn parse_date(raw: &str) -> Option<Date> {
	let prefix = raw.get(..10).unwrap_or(raw);

	Date::parse(prefix, format_description!("[year]-[month]-[day]")).ok()
}

/// Demographics the adaptor's `patient-trace-information` endpoint serves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientTraceInformation {
	/// NHS number.
	pub nhs_number: String,
	/// Given names of the current usual name.
	pub given_name: Option<Vec<String>>,
	/// Family name of the current usual name.
	pub family_name: Option<String>,
	/// Date of birth.
	pub birthdate: Option<String>,
	/// Postcode of the current home address.
	pub postal_code: Option<String>,
}

/// Suspension view served by the adaptor's `suspended-patient-status` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedPatientStatus {
	/// NHS number.
	#[serde(default)]
	pub nhs_number: String,
	/// `None` for deceased patients.
	#[serde(default)]
	pub is_suspended: Option<bool>,
	/// ODS code of the registered practice, when not suspended.
	#[serde(default)]
	pub current_ods_code: Option<String>,
	/// ODS code of the managing organisation.
	#[serde(default)]
	pub managing_organisation: Option<String>,
	/// Version token of the underlying record.
	#[serde(default, rename = "recordETag")]
	pub record_etag: Option<String>,
	/// Whether a date of death is recorded.
	#[serde(default)]
	pub is_deceased: bool,
}

/// Body of a managing-organisation update sent to the adaptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
	/// ODS code of the practice the patient left.
	pub previous_gp: String,
	/// Version token from the preceding status read.
	#[serde(rename = "recordETag")]
	pub record_etag: String,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn patient(body: &str) -> Patient {
		serde_json::from_str(body).expect("Patient fixture should decode.")
	}

	#[test]
	fn registered_patient_is_not_suspended() {
		let status = patient(
			r#"{"resourceType":"Patient","id":"9692295966","generalPractitioner":[{"id":"254406A3","type":"Organization","identifier":{"system":"https://fhir.nhs.uk/Id/ods-organization-code","value":"Y12345"}}],"managingOrganization":{"identifier":{"value":"A20047"}}}"#,
		)
		.suspended_status("W/\"6\"");

		assert_eq!(status.is_suspended, Some(false));
		assert_eq!(status.current_ods_code.as_deref(), Some("Y12345"));
		assert_eq!(status.managing_organisation.as_deref(), Some("A20047"));
		assert_eq!(status.record_etag.as_deref(), Some("W/\"6\""));
	}

	#[test]
	fn patient_without_gp_is_suspended() {
		let status = patient(r#"{"id":"9692295966","generalPractitioner":[]}"#).suspended_status("W/1");

		assert_eq!(status.is_suspended, Some(true));
		assert_eq!(status.current_ods_code, None);
		assert!(!status.is_deceased);
	}

	#[test]
	fn deceased_patient_has_no_suspension_state() {
		let status = patient(
			r#"{"id":"9692295966","deceasedDateTime":"2010-10-22T00:00:00+00:00","generalPractitioner":[{"identifier":{"value":"Y12345"}}]}"#,
		)
		.suspended_status("W/1");

		assert!(status.is_deceased);
		assert_eq!(status.is_suspended, None);
	}

	#[test]
	fn status_uses_adaptor_field_names() {
		let update = StatusUpdate { previous_gp: "B1234".into(), record_etag: "W/\"5\"".into() };
		let value = serde_json::to_value(&update).expect("Update should serialize.");

		assert_eq!(value, serde_json::json!({ "previousGp": "B1234", "recordETag": "W/\"5\"" }));

		let status: SuspendedPatientStatus = serde_json::from_str(
			r#"{"nhsNumber":"9692295966","isSuspended":true,"currentOdsCode":null,"managingOrganisation":"B1234","recordETag":"W/\"5\"","isDeceased":false}"#,
		)
		.expect("Adaptor status should decode.");

		assert_eq!(status.record_etag.as_deref(), Some("W/\"5\""));
	}

	#[test]
	fn trace_information_uses_current_usual_name_and_home_address() {
		let record = patient(
			r#"{"id":"9692295966","birthDate":"1984-03-02","name":[{"use":"usual","period":{"start":"2000-01-01","end":"2010-01-01"},"given":["Old"],"family":"Name"},{"use":"Usual","period":{"start":"2010-01-02"},"given":["Jane","Ann"],"family":"Smith"},{"use":"nickname","period":{"start":"2010-01-02"},"given":["JJ"]}],"address":[{"use":"temp","period":{"start":"2020-01-01"},"postalCode":"LS1 6AE"},{"use":"home","period":{"start":"2015-05-01","end":"2030-01-01"},"postalCode":"DN17 3HT"}]}"#,
		);
		let trace = record.trace_information_on(datetime!(2024-03-01 0:00 UTC).date());

		assert_eq!(trace.nhs_number, "9692295966");
		assert_eq!(trace.given_name, Some(vec!["Jane".to_owned(), "Ann".to_owned()]));
		assert_eq!(trace.family_name.as_deref(), Some("Smith"));
		assert_eq!(trace.birthdate.as_deref(), Some("1984-03-02"));
		assert_eq!(trace.postal_code.as_deref(), Some("DN17 3HT"));
	}

	#[test]
	fn trace_information_is_empty_without_current_entries() {
		let record = patient(
			r#"{"id":"9692295966","name":[{"use":"usual","period":{"start":"2030-01-01"},"given":["Future"]}],"address":[{"use":"home","period":{"start":"2015-05-01","end":"2024-03-01"},"postalCode":"DN17 3HT"},{"use":"home","postalCode":"LS1 6AE"}]}"#,
		);
		let trace = record.trace_information_on(datetime!(2024-03-01 0:00 UTC).date());

		assert_eq!(trace.given_name, None);
		assert_eq!(trace.family_name, None);
		assert_eq!(trace.birthdate, None);
		assert_eq!(trace.postal_code, None);
		assert_eq!(
			serde_json::to_value(&trace).expect("Trace view should serialize."),
			serde_json::json!({
				"nhsNumber": "9692295966",
				"givenName": null,
				"familyName": null,
				"birthdate": null,
				"postalCode": null,
			})
		);
	}

	#[test]
	fn period_bounds_are_exclusive() {
		let today = datetime!(2024-03-01 0:00 UTC).date();
		let period = |start: Option<&str>, end: Option<&str>| Period {
			start: start.map(str::to_owned),
			end: end.map(str::to_owned),
		};

		assert!(period(Some("2024-02-29"), None).is_current_on(today));
		assert!(!period(Some("2024-03-01"), None).is_current_on(today));
		assert!(!period(Some("2020-01-01"), Some("2024-03-01")).is_current_on(today));
		assert!(period(Some("2020-01-01"), Some("2024-03-02")).is_current_on(today));
		assert!(!period(None, None).is_current_on(today));
		assert!(!period(Some("not a date"), None).is_current_on(today));
	}
}
