//! Salesforce CRM client.
//!
//! Logs in once with the SOAP partner `login` call (username, password and
//! security token), then talks to the REST API with the returned session id
//! as a bearer token: SOQL for lookups, `sobjects` for create/update/delete.

use std::time::Duration;

use serde_json::{Map, Value};

use benchsync_core::config::CrmConfig;
use benchsync_core::error::{RemoteError, Service};
use benchsync_core::fields::FieldMap;
use benchsync_core::ports::CrmClient;
use benchsync_core::types::{Account, Benchmark, Contact, CrmId};

use crate::http::{self, str_field};

const SVC: Service = Service::Crm;

/// An authenticated REST session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    /// `https://host` the REST API lives on.
    pub instance_url: String,
}

/// Blocking Salesforce client bound to one session.
pub struct SalesforceClient {
    agent: ureq::Agent,
    session: Session,
    api_version: String,
    benchmark_object: String,
    benchmark_id_field: String,
}

impl SalesforceClient {
    /// Log in and return a ready client.
    pub fn login(config: &CrmConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let agent = http::agent(timeout);
        let url = format!(
            "{}/services/Soap/u/{}",
            config.login_url.trim_end_matches('/'),
            config.api_version
        );
        let envelope = login_envelope(
            &config.username,
            &format!("{}{}", config.password, config.security_token),
        );
        let request = agent
            .post(&url)
            .set("Content-Type", "text/xml; charset=UTF-8")
            .set("SOAPAction", "login");

        let response = match http::send_text(SVC, request, &envelope) {
            Ok(body) => body,
            // Login faults come back as HTTP 500 with a SOAP fault body.
            Err(RemoteError::Status { message, .. }) => {
                return Err(RemoteError::Auth {
                    service: SVC,
                    message: soap_fault(&message).unwrap_or(message),
                })
            }
            Err(other) => return Err(other),
        };
        let mut session = parse_login_response(&response)?;
        if session.instance_url.is_empty() {
            session.instance_url = config.instance.trim_end_matches('/').to_string();
        }
        tracing::info!("logged in to {}", session.instance_url);

        Ok(SalesforceClient {
            agent,
            session,
            api_version: config.api_version.clone(),
            benchmark_object: config.benchmark_object.clone(),
            benchmark_id_field: config.benchmark_id_field.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.session.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.session.session_id))
            .set("Accept", "application/json")
    }

    /// Run a SOQL query, following `nextRecordsUrl` pages.
    fn query(&self, soql: &str) -> Result<Vec<Value>, RemoteError> {
        tracing::debug!("SOQL: {soql}");
        let request = self.request("GET", &self.data_url("query/")).query("q", soql);
        let mut page = http::send(SVC, request, None)?;
        let mut records = Vec::new();
        loop {
            if let Some(items) = page.get("records").and_then(Value::as_array) {
                records.extend(items.iter().cloned());
            }
            let Some(next) = page.get("nextRecordsUrl").and_then(Value::as_str) else {
                break;
            };
            let url = format!("{}{}", self.session.instance_url, next);
            page = http::send(SVC, self.request("GET", &url), None)?;
        }
        Ok(records)
    }

    fn sobject_url(&self, object: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => self.data_url(&format!("sobjects/{object}/{id}")),
            None => self.data_url(&format!("sobjects/{object}/")),
        }
    }

    fn get_sobject(&self, object: &str, id: &str) -> Result<Value, RemoteError> {
        http::send(SVC, self.request("GET", &self.sobject_url(object, Some(id))), None)
    }

    /// POST a new sobject and return its id.
    fn create_sobject(&self, object: &str, body: &Value) -> Result<String, RemoteError> {
        let response = http::send(
            SVC,
            self.request("POST", &self.sobject_url(object, None)),
            Some(body),
        )?;
        create_result_id(&response)
    }

    fn patch_sobject(&self, object: &str, id: &str, fields: &FieldMap) -> Result<(), RemoteError> {
        let request = self
            .request("PATCH", &self.sobject_url(object, Some(id)))
            .set("Content-Type", "application/json");
        http::send(SVC, request, Some(&fields.to_json()))?;
        Ok(())
    }
}

impl CrmClient for SalesforceClient {
    fn find_accounts_by_name(&self, name: &str) -> Result<Vec<Account>, RemoteError> {
        let soql = format!(
            "SELECT Id, Name, RecordTypeId FROM Account WHERE Name = '{}'",
            escape_soql(name)
        );
        self.query(&soql)?.iter().map(parse_account).collect()
    }

    fn create_account(&self, name: &str, fields: &FieldMap) -> Result<Account, RemoteError> {
        if !self.find_accounts_by_name(name)?.is_empty() {
            return Err(RemoteError::Rejected {
                service: SVC,
                message: format!("account '{name}' already exists"),
            });
        }
        let body = with_field(fields, "Name", name);
        let id = self.create_sobject("Account", &body)?;
        parse_account(&self.get_sobject("Account", &id)?)
    }

    fn update_account_by_id(&self, id: &CrmId, fields: &FieldMap) -> Result<Account, RemoteError> {
        self.patch_sobject("Account", id.as_str(), fields)?;
        parse_account(&self.get_sobject("Account", id.as_str())?)
    }

    fn delete_account_by_id(&self, id: &CrmId) -> Result<bool, RemoteError> {
        let request = self.request("DELETE", &self.sobject_url("Account", Some(id.as_str())));
        match http::send(SVC, request, None) {
            Ok(_) => Ok(true),
            Err(RemoteError::Status { status: 404, .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn find_contacts_by_email(&self, email: &str) -> Result<Vec<Contact>, RemoteError> {
        let soql = format!(
            "SELECT Id, Email, AccountId, LastName FROM Contact WHERE Email = '{}'",
            escape_soql(email)
        );
        self.query(&soql)?.iter().map(parse_contact).collect()
    }

    fn create_contact(&self, email: &str, fields: &FieldMap) -> Result<Contact, RemoteError> {
        if !self.find_contacts_by_email(email)?.is_empty() {
            return Err(RemoteError::Rejected {
                service: SVC,
                message: format!("contact '{email}' already exists"),
            });
        }
        let body = with_field(fields, "Email", email);
        let id = self.create_sobject("Contact", &body)?;
        parse_contact(&self.get_sobject("Contact", &id)?)
    }

    fn get_benchmark_by_custom_id(
        &self,
        custom_id: &str,
    ) -> Result<Option<Benchmark>, RemoteError> {
        let soql = format!(
            "SELECT Id FROM {} WHERE {} = '{}'",
            self.benchmark_object,
            self.benchmark_id_field,
            escape_soql(custom_id)
        );
        let rows = self.query(&soql)?;
        let id = match rows.as_slice() {
            [] => return Ok(None),
            [row] => str_field(SVC, row, "Id")?.to_string(),
            _ => {
                return Err(RemoteError::Ambiguous {
                    service: SVC,
                    entity: "benchmark",
                    key: custom_id.to_string(),
                    count: rows.len(),
                })
            }
        };
        let object = self.get_sobject(&self.benchmark_object, &id)?;
        parse_benchmark(&object, &self.benchmark_id_field).map(Some)
    }

    fn get_benchmark_by_id(&self, id: &str) -> Result<Option<Benchmark>, RemoteError> {
        match self.get_sobject(&self.benchmark_object, id) {
            Ok(object) => parse_benchmark(&object, &self.benchmark_id_field).map(Some),
            Err(RemoteError::Status { status: 404, .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn update_benchmark(&self, id: &str, fields: &FieldMap) -> Result<(), RemoteError> {
        self.patch_sobject(&self.benchmark_object, id, fields)
    }
}

// ---------------------------------------------------------------------------
// SOAP login
// ---------------------------------------------------------------------------

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn login_envelope(username: &str, password_and_token: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        xml_escape(username),
        xml_escape(password_and_token)
    )
}

/// Text of the first `<tag>…</tag>` element, ignoring namespace prefixes.
fn element_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = xml
        .match_indices('<')
        .map(|(i, _)| i)
        .find(|&i| {
            let rest = &xml[i + 1..];
            let Some(name_end) = rest.find(|c: char| c == '>' || c.is_whitespace()) else {
                return false;
            };
            let name = &rest[..name_end];
            !name.starts_with('/') && name.rsplit(':').next() == Some(tag)
        })?;
    let start = open + xml[open..].find('>')? + 1;
    let end = start + xml[start..].find("</")?;
    Some(&xml[start..end])
}

fn soap_fault(xml: &str) -> Option<String> {
    element_text(xml, "faultstring").map(|s| s.trim().to_string())
}

/// Extract the session id and REST host from a SOAP login response.
pub(crate) fn parse_login_response(xml: &str) -> Result<Session, RemoteError> {
    if let Some(fault) = soap_fault(xml) {
        return Err(RemoteError::Auth {
            service: SVC,
            message: fault,
        });
    }
    let session_id = element_text(xml, "sessionId").ok_or_else(|| RemoteError::Auth {
        service: SVC,
        message: "login response has no sessionId".to_string(),
    })?;
    let instance_url = element_text(xml, "serverUrl")
        .and_then(instance_from_server_url)
        .unwrap_or_default();
    Ok(Session {
        session_id: session_id.trim().to_string(),
        instance_url,
    })
}

/// `https://host/services/Soap/u/52.0/00D…` → `https://host`.
pub(crate) fn instance_from_server_url(server_url: &str) -> Option<String> {
    let server_url = server_url.trim();
    let (scheme, rest) = server_url.split_once("://")?;
    let host = rest.split('/').next().filter(|h| !h.is_empty())?;
    Some(format!("{scheme}://{host}"))
}

// ---------------------------------------------------------------------------
// SOQL and payload helpers
// ---------------------------------------------------------------------------

/// Escape a value for use inside a single-quoted SOQL string literal.
pub fn escape_soql(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

fn with_field(fields: &FieldMap, key: &str, value: &str) -> Value {
    let mut body = match fields.to_json() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    body.insert(key.to_string(), Value::String(value.to_string()));
    Value::Object(body)
}

/// `{"id": "...", "success": true, "errors": []}` → id.
fn create_result_id(response: &Value) -> Result<String, RemoteError> {
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        let errors = response
            .get("errors")
            .map(|e| http::server_message(&e.to_string()))
            .unwrap_or_default();
        return Err(RemoteError::Rejected {
            service: SVC,
            message: errors,
        });
    }
    Ok(str_field(SVC, response, "id")?.to_string())
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn parse_account(value: &Value) -> Result<Account, RemoteError> {
    Ok(Account {
        id: CrmId(str_field(SVC, value, "Id")?.to_string()),
        name: str_field(SVC, value, "Name")?.to_string(),
        record_type_id: opt_str(value, "RecordTypeId"),
    })
}

fn parse_contact(value: &Value) -> Result<Contact, RemoteError> {
    Ok(Contact {
        id: CrmId(str_field(SVC, value, "Id")?.to_string()),
        email: opt_str(value, "Email").unwrap_or_default(),
        account_id: opt_str(value, "AccountId").map(CrmId),
        last_name: opt_str(value, "LastName"),
    })
}

fn parse_benchmark(value: &Value, custom_id_field: &str) -> Result<Benchmark, RemoteError> {
    Ok(Benchmark {
        id: CrmId(str_field(SVC, value, "Id")?.to_string()),
        custom_id: opt_str(value, custom_id_field),
        fields: scalar_fields(value),
    })
}

/// Scalar fields of an sobject; `attributes` and compound fields dropped.
fn scalar_fields(object: &Value) -> FieldMap {
    let Some(map) = object.as_object() else {
        return FieldMap::new();
    };
    map.iter()
        .filter(|(k, _)| k.as_str() != "attributes")
        .filter_map(|(k, v)| {
            benchsync_core::fields::FieldValue::try_from(v.clone())
                .ok()
                .map(|fv| (k.clone(), fv))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchsync_core::fields::FieldValue;
    use rstest::rstest;
    use serde_json::json;

    const LOGIN_OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com">
<soapenv:Body><loginResponse><result>
<metadataServerUrl>https://acme.my.salesforce.com/services/Soap/m/52.0/00D5e000000XyZ</metadataServerUrl>
<passwordExpired>false</passwordExpired>
<serverUrl>https://acme.my.salesforce.com/services/Soap/u/52.0/00D5e000000XyZ</serverUrl>
<sessionId>00D5e000000XyZ!AQ0AQK.token</sessionId>
</result></loginResponse></soapenv:Body></soapenv:Envelope>"#;

    const LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>
<soapenv:Fault><faultcode>INVALID_LOGIN</faultcode>
<faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>
</soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

    #[test]
    fn login_response_yields_session() {
        let session = parse_login_response(LOGIN_OK).expect("session");
        assert_eq!(session.session_id, "00D5e000000XyZ!AQ0AQK.token");
        assert_eq!(session.instance_url, "https://acme.my.salesforce.com");
    }

    #[test]
    fn login_fault_is_auth_error_with_server_text() {
        let err = parse_login_response(LOGIN_FAULT).unwrap_err();
        assert!(matches!(err, RemoteError::Auth { .. }));
        assert!(err.to_string().contains("INVALID_LOGIN: Invalid username"));
    }

    #[test]
    fn envelope_escapes_credentials() {
        let xml = login_envelope("a&b@example.com", "p<w>d\"tok");
        assert!(xml.contains("<n1:username>a&amp;b@example.com</n1:username>"));
        assert!(xml.contains("<n1:password>p&lt;w&gt;d&quot;tok</n1:password>"));
    }

    #[rstest]
    #[case("O'Brien & Sons", r"O\'Brien & Sons")]
    #[case(r"back\slash", r"back\\slash")]
    #[case("line\nbreak", r"line\nbreak")]
    #[case("' OR Name != '", r"\' OR Name != \'")]
    #[case("plain", "plain")]
    fn soql_escaping(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_soql(input), expected);
    }

    #[test]
    fn server_url_to_instance() {
        assert_eq!(
            instance_from_server_url("https://na1.salesforce.com/services/Soap/u/52.0/00D"),
            Some("https://na1.salesforce.com".to_string())
        );
        assert_eq!(instance_from_server_url("not a url"), None);
    }

    #[test]
    fn contact_decodes_optional_account() {
        let contact = parse_contact(&json!({
            "attributes": {"type": "Contact"},
            "Id": "003A",
            "Email": "x@example.com",
            "AccountId": null,
            "LastName": "X"
        }))
        .unwrap();
        assert_eq!(contact.account_id, None);
        assert_eq!(contact.last_name.as_deref(), Some("X"));
    }

    #[test]
    fn create_result_surfaces_errors() {
        let failed = json!({"id": "", "success": false, "errors": [{"message": "bad", "errorCode": "X"}]});
        let err = create_result_id(&failed).unwrap_err();
        assert!(err.to_string().contains("X: bad"));
        assert_eq!(
            create_result_id(&json!({"id": "001A", "success": true, "errors": []})).unwrap(),
            "001A"
        );
    }

    #[test]
    fn scalar_fields_drop_attributes_and_compounds() {
        let fields = scalar_fields(&json!({
            "attributes": {"type": "Benchmark__c"},
            "Id": "a01",
            "Name": "Lab",
            "Address__c": {"city": "Golden"},
            "Score__c": 71
        }));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("Score__c"), Some(&FieldValue::from(71u64)));
        assert!(!fields.contains("attributes"));
    }

    #[test]
    fn benchmark_keeps_record_id_and_custom_id_apart() {
        let benchmark = parse_benchmark(
            &json!({
                "attributes": {"type": "Benchmark__c"},
                "Id": "a01X",
                "Salesforce_Benchmark_ID__c": "BENCH-1",
                "Name": "Lab"
            }),
            "Salesforce_Benchmark_ID__c",
        )
        .unwrap();
        assert_eq!(benchmark.id.as_str(), "a01X");
        assert_eq!(benchmark.custom_id.as_deref(), Some("BENCH-1"));
        assert_eq!(benchmark.fields.get("Name"), Some(&FieldValue::from("Lab")));
    }

    #[test]
    fn with_field_adds_identity_key() {
        let body = with_field(&FieldMap::new().with("LastName", "Owner"), "Email", "o@example.com");
        assert_eq!(body, json!({"LastName": "Owner", "Email": "o@example.com"}));
    }
}
