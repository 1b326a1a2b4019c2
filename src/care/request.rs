//! Typed view of a care-request row and its decoder.
//!
//! The store hands back untyped field maps. [`CareRequest::decode`] walks
//! every column once, applying a required/optional policy and defaults, and
//! reports all problems together as a [`DecodeError`] so a bad row can be
//! dropped and logged without aborting the surrounding listing.

use super::citizen_id::CitizenId;
use crate::store::{formula::Timestamp, Record};
use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

/// Column names in the record store.
pub mod columns {
    pub const CITIZEN_ID: &str = "Citizen ID";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const PHONE_NUMBER: &str = "Phone Number";
    pub const EMAIL: &str = "Email";
    pub const SEX: &str = "Sex";
    pub const DATE_OF_BIRTH: &str = "Date of Birth";
    pub const STATUS: &str = "Status";
    pub const STREET_ADDRESS: &str = "Street Address";
    pub const SUBDISTRICT: &str = "Subdistrict";
    pub const DISTRICT: &str = "District";
    pub const PROVINCE: &str = "Province";
    pub const POSTAL_CODE: &str = "Postal Code";
    pub const REQUEST_DATETIME: &str = "Request Datetime";
    pub const CHANNEL: &str = "Channel";
    pub const COVID_TEST_DOCUMENT_IMAGE: &str = "Covid Test Document Image";
    pub const COVID_TEST_LOCATION_TYPE: &str = "Covid Test Location Type";
    pub const COVID_TEST_LOCATION_NAME: &str = "Covid Test Location Name";
    pub const COVID_TEST_DATE: &str = "Covid Test Date";
    pub const COVID_TEST_CONFIRMATION_DATE: &str = "Covid Test Confirmation Date";
    pub const SYMPTOMS: &str = "Symptoms";
    pub const SYMPTOMS_LEVEL: &str = "Symptoms Level";
    pub const OTHER_SYMPTOMS: &str = "Other Symptoms";
    pub const CARE_STATUS: &str = "Care Status";
    pub const CARE_PROVIDER_NAME: &str = "Care Provider Name";
    pub const LAST_CARE_STATUS_CHANGE_DATETIME: &str = "Last Care Status Change Datetime";
    pub const LOCATION_LATITUDE: &str = "Location Latitude";
    pub const LOCATION_LONGITUDE: &str = "Location Longitude";
    pub const CARETAKER_FIRST_NAME: &str = "Caretaker First Name";
    pub const CARETAKER_LAST_NAME: &str = "Caretaker Last Name";
    pub const CARETAKER_EMAIL: &str = "Caretaker Email";
    pub const CARETAKER_PHONE_NUMBER: &str = "Caretaker Phone Number";
    pub const CARETAKER_RELATIONSHIP: &str = "Caretaker Relationship";
    pub const CHECKER: &str = "Checker";
    pub const NOTE: &str = "Note";
    pub const LAST_STATUS_CHANGE_DATETIME: &str = "Last Status Change Datetime";
}

/// Contact status: whether outreach to the citizen is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Uncontacted,
    Working,
    Finished,
    NotCompatible,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Uncontacted => "UNCONTACTED",
            RequestStatus::Working => "WORKING",
            RequestStatus::Finished => "FINISHED",
            RequestStatus::NotCompatible => "NOT_COMPATIBLE",
        }
    }
}

/// Whether the citizen has sought or received care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CareStatus {
    NotSeeking,
    Seeking,
    Provided,
}

impl CareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareStatus::NotSeeking => "NOT_SEEKING",
            CareStatus::Seeking => "SEEKING",
            CareStatus::Provided => "PROVIDED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symptom {
    Fever,
    Cough,
    Hemoptysis,
    Dyspnea,
    Orthopnea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CovidTestLocationType {
    PublicHealthCenter,
    ProactiveOrMobile,
    BmaHospital,
    PublicHospital,
    PrivateHospital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Channel {
    #[default]
    #[serde(rename = "BKKCOVID19CONNECT")]
    BkkCovid19Connect,
}

/// A care request as exposed by the public API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareRequest {
    pub id: String,
    pub citizen_id: CitizenId,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub sex: Sex,
    pub date_of_birth: NaiveDate,
    pub status: RequestStatus,
    pub street_address: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub postal_code: String,
    pub request_datetime: DateTime<FixedOffset>,
    pub channel: Channel,
    pub covid_test_document_image_url: Option<String>,
    pub covid_test_location_type: CovidTestLocationType,
    pub covid_test_location_name: String,
    pub covid_test_date: NaiveDate,
    pub covid_test_confirmation_date: Option<NaiveDate>,
    pub symptoms: Vec<Symptom>,
    pub symptoms_level: Option<String>,
    pub other_symptoms: Option<String>,
    pub care_status: CareStatus,
    pub care_provider_name: Option<String>,
    pub last_care_status_change_datetime: Option<DateTime<FixedOffset>>,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub caretaker_first_name: String,
    pub caretaker_last_name: String,
    pub caretaker_email: Option<String>,
    pub caretaker_phone_number: String,
    pub caretaker_relationship: String,
    pub checker: Option<String>,
    pub note: Option<String>,
    pub last_status_change_datetime: Option<DateTime<FixedOffset>>,
}

/// One column that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every problem found in a single row.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("record {record_id} failed validation: {}", summarize(.errors))]
pub struct DecodeError {
    pub record_id: String,
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl CareRequest {
    /// Decode a store row. `zone` is attached to timestamps stored without an offset.
    pub fn decode(record: &Record, zone: FixedOffset) -> Result<Self, DecodeError> {
        use columns::*;

        let mut r = FieldReader::new(&record.fields, zone);

        let citizen_id = r.required(CITIZEN_ID, |v| {
            let text = as_text(v)?;
            CitizenId::from_hyphenated(text)
                .or_else(|_| CitizenId::parse(text))
                .map_err(|e| e.to_string())
        });
        let first_name = r.required(FIRST_NAME, parse_text);
        let last_name = r.required(LAST_NAME, parse_text);
        let phone_number = r.required(PHONE_NUMBER, parse_phone);
        let email = r.optional(EMAIL, parse_email);
        let sex = r.required(SEX, parse_enumeration::<Sex>);
        let date_of_birth = r.required(DATE_OF_BIRTH, parse_date);
        let status = r.required(STATUS, parse_enumeration::<RequestStatus>);
        let street_address = r.required(STREET_ADDRESS, parse_text);
        let subdistrict = r.required(SUBDISTRICT, parse_text);
        let district = r.required(DISTRICT, parse_text);
        let province = r.required(PROVINCE, parse_text);
        let postal_code = r.required(POSTAL_CODE, parse_postal_code);
        let request_datetime = r.required_datetime(REQUEST_DATETIME);
        let channel = r
            .optional(CHANNEL, parse_enumeration::<Channel>)
            .unwrap_or_default();
        let covid_test_document_image_url =
            r.optional(COVID_TEST_DOCUMENT_IMAGE, first_attachment_url);
        let covid_test_location_type =
            r.required(COVID_TEST_LOCATION_TYPE, parse_enumeration::<CovidTestLocationType>);
        let covid_test_location_name = r.required(COVID_TEST_LOCATION_NAME, parse_text);
        let covid_test_date = r.required(COVID_TEST_DATE, parse_date);
        let covid_test_confirmation_date = r.optional(COVID_TEST_CONFIRMATION_DATE, parse_date);
        let symptoms = r
            .optional(SYMPTOMS, parse_enumeration::<Vec<Symptom>>)
            .unwrap_or_default();
        let symptoms_level = r.optional(SYMPTOMS_LEVEL, parse_text);
        let other_symptoms = r.optional(OTHER_SYMPTOMS, parse_text);
        let care_status = r.required(CARE_STATUS, parse_enumeration::<CareStatus>);
        let care_provider_name = r.optional(CARE_PROVIDER_NAME, parse_text);
        let last_care_status_change_datetime =
            r.optional_datetime(LAST_CARE_STATUS_CHANGE_DATETIME);
        let location_latitude = r.required(LOCATION_LATITUDE, parse_number);
        let location_longitude = r.required(LOCATION_LONGITUDE, parse_number);
        let caretaker_first_name = r.required(CARETAKER_FIRST_NAME, parse_text);
        let caretaker_last_name = r.required(CARETAKER_LAST_NAME, parse_text);
        let caretaker_email = r.optional(CARETAKER_EMAIL, parse_email);
        let caretaker_phone_number = r.required(CARETAKER_PHONE_NUMBER, parse_phone);
        let caretaker_relationship = r.required(CARETAKER_RELATIONSHIP, parse_text);
        let checker = r.optional(CHECKER, parse_text);
        let note = r.optional(NOTE, parse_text);
        let last_status_change_datetime = r.optional_datetime(LAST_STATUS_CHANGE_DATETIME);

        let errors = r.into_errors();
        let invalid = || DecodeError {
            record_id: record.id.clone(),
            errors: errors.clone(),
        };
        if !errors.is_empty() {
            return Err(invalid());
        }

        // Every `required` returned Some once the error list is empty.
        Ok(Self {
            id: record.id.clone(),
            citizen_id: citizen_id.ok_or_else(invalid)?,
            first_name: first_name.ok_or_else(invalid)?,
            last_name: last_name.ok_or_else(invalid)?,
            phone_number: phone_number.ok_or_else(invalid)?,
            email,
            sex: sex.ok_or_else(invalid)?,
            date_of_birth: date_of_birth.ok_or_else(invalid)?,
            status: status.ok_or_else(invalid)?,
            street_address: street_address.ok_or_else(invalid)?,
            subdistrict: subdistrict.ok_or_else(invalid)?,
            district: district.ok_or_else(invalid)?,
            province: province.ok_or_else(invalid)?,
            postal_code: postal_code.ok_or_else(invalid)?,
            request_datetime: request_datetime.ok_or_else(invalid)?,
            channel,
            covid_test_document_image_url,
            covid_test_location_type: covid_test_location_type.ok_or_else(invalid)?,
            covid_test_location_name: covid_test_location_name.ok_or_else(invalid)?,
            covid_test_date: covid_test_date.ok_or_else(invalid)?,
            covid_test_confirmation_date,
            symptoms,
            symptoms_level,
            other_symptoms,
            care_status: care_status.ok_or_else(invalid)?,
            care_provider_name,
            last_care_status_change_datetime,
            location_latitude: location_latitude.ok_or_else(invalid)?,
            location_longitude: location_longitude.ok_or_else(invalid)?,
            caretaker_first_name: caretaker_first_name.ok_or_else(invalid)?,
            caretaker_last_name: caretaker_last_name.ok_or_else(invalid)?,
            caretaker_email,
            caretaker_phone_number: caretaker_phone_number.ok_or_else(invalid)?,
            caretaker_relationship: caretaker_relationship.ok_or_else(invalid)?,
            checker,
            note,
            last_status_change_datetime,
        })
    }
}

/// Reads columns out of a field map, collecting errors instead of bailing.
struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    zone: FixedOffset,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a Map<String, Value>, zone: FixedOffset) -> Self {
        Self {
            fields,
            zone,
            errors: Vec::new(),
        }
    }

    /// Missing, null and empty-string values count as absent.
    fn present(&self, name: &str) -> Option<&'a Value> {
        match self.fields.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn fail(&mut self, name: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: name.to_string(),
            message: message.into(),
        });
    }

    fn required<T>(&mut self, name: &str, parse: impl FnOnce(&Value) -> Result<T, String>) -> Option<T> {
        match self.present(name) {
            None => {
                self.fail(name, "field required");
                None
            }
            Some(value) => match parse(value) {
                Ok(parsed) => Some(parsed),
                Err(message) => {
                    self.fail(name, message);
                    None
                }
            },
        }
    }

    fn optional<T>(&mut self, name: &str, parse: impl FnOnce(&Value) -> Result<T, String>) -> Option<T> {
        let value = self.present(name)?;
        match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(message) => {
                self.fail(name, message);
                None
            }
        }
    }

    fn required_datetime(&mut self, name: &str) -> Option<DateTime<FixedOffset>> {
        let zone = self.zone;
        self.required(name, |v| parse_datetime(v, zone))
    }

    fn optional_datetime(&mut self, name: &str) -> Option<DateTime<FixedOffset>> {
        let zone = self.zone;
        self.optional(name, |v| parse_datetime(v, zone))
    }

    fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

fn as_text(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected text, got {}", value))
}

fn parse_text(value: &Value) -> Result<String, String> {
    as_text(value).map(|s| s.trim().to_string())
}

fn parse_enumeration<T: DeserializeOwned>(value: &Value) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    let s = as_text(value)?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn parse_datetime(value: &Value, zone: FixedOffset) -> Result<DateTime<FixedOffset>, String> {
    let s = as_text(value)?;
    s.parse::<Timestamp>()?
        .with_default_zone(zone)
        .map_err(|e| e.to_string())
}

fn parse_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("invalid number {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", s)),
        other => Err(format!("expected number, got {}", other)),
    }
}

/// Thai phone numbers: 9 or 10 digits once separators are removed.
fn parse_phone(value: &Value) -> Result<String, String> {
    let s = as_text(value)?;
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = digits.strip_prefix("+66").map(|rest| format!("0{}", rest)).unwrap_or(digits);
    if (9..=10).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(format!("invalid phone number '{}'", s))
    }
}

fn parse_email(value: &Value) -> Result<String, String> {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex must compile")
    });

    let s = as_text(value)?.trim();
    if re.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(format!("invalid email '{}'", s))
    }
}

fn parse_postal_code(value: &Value) -> Result<String, String> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        other => as_text(other)?.trim().to_string(),
    };
    if s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit()) {
        Ok(s)
    } else {
        Err(format!("postal code must be 5 digits, got '{}'", s))
    }
}

fn first_attachment_url(value: &Value) -> Result<String, String> {
    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|item| item.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "expected an attachment list with a url".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zone() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn complete_fields() -> Value {
        json!({
            "Citizen ID": "1-2345-67890-12-3",
            "First Name": "Somchai",
            "Last Name": "Jaidee",
            "Phone Number": "081-234-5678",
            "Sex": "MALE",
            "Date of Birth": "1980-01-31",
            "Status": "FINISHED",
            "Street Address": "99 Rama IV",
            "Subdistrict": "Lumphini",
            "District": "Pathum Wan",
            "Province": "Bangkok",
            "Postal Code": "10330",
            "Request Datetime": "2021-07-10T02:30:00.000Z",
            "Covid Test Document Image": [{"url": "https://example.com/doc.jpg"}],
            "Covid Test Location Type": "BMA_HOSPITAL",
            "Covid Test Location Name": "Taksin",
            "Covid Test Date": "2021-07-08",
            "Symptoms": ["FEVER", "COUGH"],
            "Care Status": "SEEKING",
            "Location Latitude": 13.73,
            "Location Longitude": "100.54",
            "Caretaker First Name": "Somsri",
            "Caretaker Last Name": "Jaidee",
            "Caretaker Phone Number": "0812345679",
            "Caretaker Relationship": "Spouse"
        })
    }

    fn record(fields: Value) -> Record {
        serde_json::from_value(json!({"id": "rec1", "fields": fields})).unwrap()
    }

    #[test]
    fn test_decode_complete_record() {
        let request = CareRequest::decode(&record(complete_fields()), zone()).unwrap();
        assert_eq!(request.citizen_id.as_str(), "1234567890123");
        assert_eq!(request.phone_number, "0812345678");
        assert_eq!(request.status, RequestStatus::Finished);
        assert_eq!(request.care_status, CareStatus::Seeking);
        assert_eq!(request.channel, Channel::BkkCovid19Connect);
        assert_eq!(request.symptoms, vec![Symptom::Fever, Symptom::Cough]);
        assert_eq!(
            request.covid_test_document_image_url.as_deref(),
            Some("https://example.com/doc.jpg")
        );
        assert_eq!(request.location_longitude, 100.54);
        assert!(request.note.is_none());
        assert_eq!(request.request_datetime.to_rfc3339(), "2021-07-10T02:30:00+00:00");
    }

    #[test]
    fn test_decode_defaults_optional_collections() {
        let mut fields = complete_fields();
        fields.as_object_mut().unwrap().remove("Symptoms");
        let request = CareRequest::decode(&record(fields), zone()).unwrap();
        assert!(request.symptoms.is_empty());
    }

    #[test]
    fn test_decode_collects_all_errors() {
        let mut fields = complete_fields();
        let map = fields.as_object_mut().unwrap();
        map.insert("Phone Number".to_string(), json!("call me"));
        map.remove("First Name");
        map.insert("Status".to_string(), json!("LOST"));

        let err = CareRequest::decode(&record(fields), zone()).unwrap_err();
        assert_eq!(err.record_id, "rec1");
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["First Name", "Phone Number", "Status"]);
        assert!(err.to_string().contains("Phone Number"));
    }

    #[test]
    fn test_decode_treats_blank_as_missing() {
        let mut fields = complete_fields();
        fields
            .as_object_mut()
            .unwrap()
            .insert("Email".to_string(), json!("   "));
        let request = CareRequest::decode(&record(fields), zone()).unwrap();
        assert!(request.email.is_none());
    }

    #[test]
    fn test_decode_attaches_zone_to_naive_datetime() {
        let mut fields = complete_fields();
        fields
            .as_object_mut()
            .unwrap()
            .insert("Request Datetime".to_string(), json!("2021-07-10T09:30:00"));
        let request = CareRequest::decode(&record(fields), zone()).unwrap();
        assert_eq!(request.request_datetime.to_rfc3339(), "2021-07-10T09:30:00+07:00");
    }

    #[test]
    fn test_decode_rejects_datetime_outside_calendar() {
        let mut fields = complete_fields();
        fields
            .as_object_mut()
            .unwrap()
            .insert("Request Datetime".to_string(), json!("-262143-01-01T00:00:00"));
        let err = CareRequest::decode(&record(fields), zone()).unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["Request Datetime"]);
    }

    #[test]
    fn test_phone_normalizes_country_code() {
        assert_eq!(parse_phone(&json!("+66 81 234 5678")).unwrap(), "0812345678");
        assert!(parse_phone(&json!("12")).is_err());
    }

    #[test]
    fn test_postal_code_accepts_number() {
        assert_eq!(parse_postal_code(&json!(10330)).unwrap(), "10330");
        assert!(parse_postal_code(&json!("1033")).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert_eq!(parse_email(&json!(" a.b@example.co.th ")).unwrap(), "a.b@example.co.th");
        assert!(parse_email(&json!("no-at-sign")).is_err());
        assert!(parse_email(&json!("two@@example.com")).is_err());
    }
}
