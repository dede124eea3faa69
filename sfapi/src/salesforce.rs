//! # Salesforce Adapter
//!
//! [`CrmConnection`] over the Salesforce APIs:
//!
//! * sessions are opened and closed with the SOAP partner API (`login` and
//!   `logout`), which only needs a username and a password;
//! * everything else goes through the REST API, authenticated with the
//!   session id as a bearer token.
//!
//! Batch writes use sObject Collections with `allOrNone: false`, so every
//! record gets its own outcome and one bad record never rolls back the
//! others.
use futures_util::future::try_join_all;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use sfapi_core::{
    crm::{ConnectionFactory, CrmConnection, CrmError, RecordOutcome},
    session::Credentials,
};
use std::{future::Future, sync::Arc};
use tokio::sync::RwLock;

/// Upper bound of records returned by a query, across all pages.
const MAX_FETCH: usize = 10_000;

/// Maximum number of records in one sObject Collections request.
const COLLECTION_LIMIT: usize = 200;

const PARTNER_NS: &str = "urn:partner.soap.sforce.com";

#[derive(Debug, Clone)]
pub struct SalesforceConfig {
    /// Where sessions are opened, e.g. `https://login.salesforce.com`.
    pub login_url: Url,
    /// Instance used when the login response does not name one.
    pub instance_url: Url,
    pub api_version: String,
}

/// Hands out one unauthenticated [`SalesforceConnection`] per call. The HTTP
/// client (and its connection pool) is shared; sessions never are.
#[derive(Clone)]
pub struct SalesforceFactory {
    http: reqwest::Client,
    config: Arc<SalesforceConfig>,
}

impl SalesforceFactory {
    pub fn new(http: reqwest::Client, config: SalesforceConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }
}

impl ConnectionFactory for SalesforceFactory {
    type Connection = SalesforceConnection;

    fn connect(&self) -> SalesforceConnection {
        SalesforceConnection {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            session: RwLock::new(None),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    id: String,
    instance_url: Url,
}

pub struct SalesforceConnection {
    http: reqwest::Client,
    config: Arc<SalesforceConfig>,
    session: RwLock<Option<Session>>,
}

/// A REST error entry, e.g. `{"errorCode":"INVALID_FIELD","message":"..."}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestError {
    error_code: String,
    message: String,
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    total_size: u64,
    done: bool,
    records: Vec<Value>,
    #[serde(default)]
    next_records_url: Option<String>,
}

impl SalesforceConnection {
    async fn session(&self) -> Result<Session, CrmError> {
        self.session.read().await.clone().ok_or_else(|| {
            CrmError::new("NOT_AUTHENTICATED", "No session is open on this connection")
        })
    }

    fn soap_url(&self, base: &Url) -> Result<Url, CrmError> {
        endpoint(base, ["services", "Soap", "u", self.config.api_version.as_str()])
    }

    /// A request to the REST resource named by `segments`, e.g.
    /// `["sobjects", "Account", "describe"]`.
    async fn authorized(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, CrmError> {
        let session = self.session().await?;
        let url = data_url(&session.instance_url, &self.config.api_version, segments)?;

        Ok(self.http.request(method, url).bearer_auth(session.id))
    }

    async fn get(&self, segments: &[&str]) -> Result<Value, CrmError> {
        send(self.authorized(Method::GET, segments).await?).await
    }

    /// Fetches the page at `next`, a server-relative `nextRecordsUrl`.
    async fn next_page(&self, next: String) -> Result<QueryPage, CrmError> {
        let session = self.session().await?;
        let url = session.instance_url.join(&next).map_err(|e| {
            CrmError::new("INVALID_URL", format!("Invalid next records URL '{next}': {e}"))
        })?;

        send(self.http.get(url).bearer_auth(session.id)).await
    }

    /// Sends `records` through sObject Collections, at most
    /// [`COLLECTION_LIMIT`] at a time, keeping the outcomes in batch order.
    async fn collection(
        &self,
        method: Method,
        segments: &[&str],
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        let mut outcomes = Vec::with_capacity(records.len());

        for body in collection_bodies(object, &records) {
            let req = self.authorized(method.clone(), segments).await?.json(&body);
            outcomes.extend(send::<Vec<RecordOutcome>>(req).await?);
        }

        Ok(outcomes)
    }
}

#[tonic::async_trait]
impl CrmConnection for SalesforceConnection {
    async fn login(&self, credentials: &Credentials) -> Result<(), CrmError> {
        let url = self.soap_url(&self.config.login_url)?;
        let body = login_envelope(&credentials.username, &credentials.password);
        let response = soap_call(&self.http, &url, "login", body).await?;

        let id = extract_tag(&response, "sessionId").ok_or_else(|| {
            CrmError::new("INVALID_LOGIN_RESPONSE", "Login response has no session id")
        })?;

        let instance_url = extract_tag(&response, "serverUrl")
            .and_then(|url| origin(&url))
            .unwrap_or_else(|| self.config.instance_url.clone());

        *self.session.write().await = Some(Session { id, instance_url });
        Ok(())
    }

    async fn logout(&self) -> Result<(), CrmError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let url = self.soap_url(&session.instance_url)?;
        soap_call(&self.http, &url, "logout", logout_envelope(&session.id)).await?;
        Ok(())
    }

    async fn query(&self, soql: &str) -> Result<Value, CrmError> {
        let req = self
            .authorized(Method::GET, &["query"])
            .await?
            .query(&[("q", soql)]);
        let first: QueryPage = send(req).await?;

        fetch_all(first, |next| self.next_page(next)).await
    }

    async fn search(&self, sosl: &str) -> Result<Value, CrmError> {
        let req = self
            .authorized(Method::GET, &["search"])
            .await?
            .query(&[("q", sosl)]);
        send(req).await
    }

    async fn describe(&self, object: &str) -> Result<Value, CrmError> {
        self.get(&["sobjects", object, "describe"]).await
    }

    async fn retrieve(&self, object: &str, ids: &[String]) -> Result<Value, CrmError> {
        let records = try_join_all(ids.iter().map(|id| self.get_record(object, id))).await?;

        Ok(Value::Array(records))
    }

    async fn create(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.collection(Method::POST, &["composite", "sobjects"], object, records)
            .await
    }

    async fn update(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.collection(Method::PATCH, &["composite", "sobjects"], object, records)
            .await
    }

    async fn delete(&self, object: &str, ids: &[String]) -> Result<Vec<RecordOutcome>, CrmError> {
        tracing::debug!(object, count = ids.len(), "deleting records");

        let mut outcomes = Vec::with_capacity(ids.len());

        for batch in id_batches(ids) {
            let req = self
                .authorized(Method::DELETE, &["composite", "sobjects"])
                .await?
                .query(&[("ids", batch), ("allOrNone", "false".to_string())]);
            outcomes.extend(send::<Vec<RecordOutcome>>(req).await?);
        }

        Ok(outcomes)
    }

    async fn upsert(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
        ext_id_field: &str,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        let segments = ["composite", "sobjects", object, ext_id_field];
        self.collection(Method::PATCH, &segments, object, records)
            .await
    }
}

impl SalesforceConnection {
    async fn get_record(&self, object: &str, id: &str) -> Result<Value, CrmError> {
        self.get(&["sobjects", object, id]).await
    }
}

/// Reads the pages that follow `first` until the query is done or
/// [`MAX_FETCH`] records were read.
async fn fetch_all<F, Fut>(first: QueryPage, mut next_page: F) -> Result<Value, CrmError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<QueryPage, CrmError>>,
{
    let mut page = first;
    let mut records = std::mem::take(&mut page.records);

    while !page.done && records.len() < MAX_FETCH {
        let Some(next) = page.next_records_url.take() else {
            break;
        };

        page = next_page(next).await?;
        records.append(&mut page.records);
    }

    records.truncate(MAX_FETCH);

    Ok(json!({
        "totalSize": page.total_size,
        "done": page.done,
        "records": records,
        "nextRecordsUrl": page.next_records_url,
    }))
}

/// One sObject Collections body per [`COLLECTION_LIMIT`] records.
fn collection_bodies(object: &str, records: &[Map<String, Value>]) -> Vec<Value> {
    records
        .chunks(COLLECTION_LIMIT)
        .map(|chunk| {
            let records: Vec<Value> = chunk.iter().map(|r| typed_record(object, r)).collect();
            json!({ "allOrNone": false, "records": records })
        })
        .collect()
}

/// Comma separated ids, at most [`COLLECTION_LIMIT`] per batch.
fn id_batches(ids: &[String]) -> Vec<String> {
    ids.chunks(COLLECTION_LIMIT)
        .map(|chunk| chunk.join(","))
        .collect()
}

/// `base` with `segments` appended as percent-encoded path segments.
///
/// Every segment stays one segment: `/`, `?` and `#` are encoded, so a caller
/// supplied name can never reach another resource.
fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, CrmError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    {
        let mut path = url.path_segments_mut().map_err(|()| {
            CrmError::new("INVALID_URL", format!("'{base}' cannot be used as a base URL"))
        })?;
        path.pop_if_empty();

        for segment in segments {
            if matches!(segment, "" | "." | "..") {
                return Err(CrmError::new(
                    "INVALID_PATH_SEGMENT",
                    format!("'{segment}' is not a valid resource name"),
                ));
            }
            path.push(segment);
        }
    }

    Ok(url)
}

/// The REST resource `segments` under `/services/data/v{version}`.
fn data_url(instance: &Url, version: &str, segments: &[&str]) -> Result<Url, CrmError> {
    let version = format!("v{version}");
    let prefix = ["services", "data", version.as_str()];

    endpoint(instance, prefix.into_iter().chain(segments.iter().copied()))
}

/// Sends `req` and decodes a successful JSON response.
async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, CrmError> {
    let response = req.send().await.map_err(transport_error)?;
    let status = response.status();

    if status.is_success() {
        return response.json().await.map_err(transport_error);
    }

    let body = response.text().await.unwrap_or_default();
    Err(rest_error(status, &body))
}

fn transport_error(err: reqwest::Error) -> CrmError {
    let mut error = CrmError::new("RequestError", err.to_string());
    if let Some(status) = err.status() {
        error = error.with_field("status", status.as_u16());
    }
    error
}

/// Maps a REST error body to the first error it reports.
fn rest_error(status: StatusCode, body: &str) -> CrmError {
    let errors: Vec<RestError> = serde_json::from_str(body).unwrap_or_default();

    match errors.into_iter().next() {
        Some(err) => CrmError::new(&err.error_code, err.message)
            .with_field("errorCode", err.error_code)
            .with_field("fields", err.fields)
            .with_field("status", status.as_u16()),
        None => CrmError::new(format!("HTTP_{}", status.as_u16()), body)
            .with_field("status", status.as_u16()),
    }
}

/// A record tagged with its sObject type, as sObject Collections expect.
fn typed_record(object: &str, record: &Map<String, Value>) -> Value {
    let mut record = record.clone();
    record.insert("attributes".into(), json!({ "type": object }));
    Value::Object(record)
}

async fn soap_call(
    http: &reqwest::Client,
    url: &Url,
    action: &str,
    body: String,
) -> Result<String, CrmError> {
    let response = http
        .post(url.clone())
        .header("Content-Type", "text/xml; charset=UTF-8")
        .header("SOAPAction", action)
        .body(body)
        .send()
        .await
        .map_err(transport_error)?;

    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if let Some(fault) = soap_fault(&text) {
        return Err(fault.with_field("status", status.as_u16()));
    }

    if !status.is_success() {
        return Err(CrmError::new(format!("HTTP_{}", status.as_u16()), text));
    }

    Ok(text)
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<env:Body><n1:login xmlns:n1="{ns}">"#,
            "<n1:username>{username}</n1:username>",
            "<n1:password>{password}</n1:password>",
            "</n1:login></env:Body></env:Envelope>"
        ),
        ns = PARTNER_NS,
        username = escape_xml(username),
        password = escape_xml(password),
    )
}

fn logout_envelope(session_id: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<env:Header><n1:SessionHeader xmlns:n1="{ns}">"#,
            "<n1:sessionId>{session_id}</n1:sessionId>",
            "</n1:SessionHeader></env:Header>",
            r#"<env:Body><n1:logout xmlns:n1="{ns}"/></env:Body></env:Envelope>"#
        ),
        ns = PARTNER_NS,
        session_id = escape_xml(session_id),
    )
}

/// `faultcode` (without its namespace prefix) and `faultstring` of a SOAP fault.
fn soap_fault(body: &str) -> Option<CrmError> {
    let code = extract_tag(body, "faultcode")?;
    let message = extract_tag(body, "faultstring").unwrap_or_default();
    let name = code.rsplit(':').next().unwrap_or(&code).to_string();

    Some(CrmError::new(name, message).with_field("faultcode", code))
}

/// Text of the first `<tag>` element of `xml`, unescaped.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;

    Some(unescape_xml(&xml[start..end]))
}

/// `scheme://host[:port]/` of `url`.
fn origin(url: &str) -> Option<Url> {
    let origin = Url::parse(url).ok()?.origin();

    if !origin.is_tuple() {
        return None;
    }

    Url::parse(&origin.ascii_serialization()).ok()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_RESPONSE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
        "<soapenv:Body><loginResponse><result>",
        "<serverUrl>https://acme.my.salesforce.com/services/Soap/u/62.0/00D000000000001</serverUrl>",
        "<sessionId>00D000000000001!AQ4AQ&amp;token</sessionId>",
        "</result></loginResponse></soapenv:Body></soapenv:Envelope>"
    );

    const FAULT_RESPONSE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
        "<soapenv:Body><soapenv:Fault>",
        "<faultcode>sf:INVALID_LOGIN</faultcode>",
        "<faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>",
        "</soapenv:Fault></soapenv:Body></soapenv:Envelope>"
    );

    #[test]
    fn login_response_yields_session_and_instance() {
        let id = extract_tag(LOGIN_RESPONSE, "sessionId").unwrap();
        let server_url = extract_tag(LOGIN_RESPONSE, "serverUrl").unwrap();

        assert_eq!(id, "00D000000000001!AQ4AQ&token");
        assert_eq!(
            origin(&server_url).unwrap().as_str(),
            "https://acme.my.salesforce.com/"
        );
        assert!(soap_fault(LOGIN_RESPONSE).is_none());
    }

    #[test]
    fn soap_faults_are_named_after_their_code() {
        let fault = soap_fault(FAULT_RESPONSE).unwrap();

        assert_eq!(fault.name, "INVALID_LOGIN");
        assert!(fault.message.starts_with("INVALID_LOGIN: Invalid username"));
        assert_eq!(fault.fields["faultcode"], "sf:INVALID_LOGIN");
    }

    #[test]
    fn credentials_are_escaped_in_the_login_envelope() {
        let body = login_envelope("api@acme.com", "p<a>ss&word");

        assert!(body.contains("<n1:username>api@acme.com</n1:username>"));
        assert!(body.contains("<n1:password>p&lt;a&gt;ss&amp;word</n1:password>"));
    }

    #[test]
    fn rest_errors_use_the_salesforce_error_code() {
        let body = r#"[{"message":"No such column 'Foo' on entity 'Contact'","errorCode":"INVALID_FIELD"}]"#;
        let err = rest_error(StatusCode::BAD_REQUEST, body);

        assert_eq!(err.name, "INVALID_FIELD");
        assert_eq!(err.message, "No such column 'Foo' on entity 'Contact'");
        assert_eq!(err.fields["status"], 400);
    }

    #[test]
    fn unreadable_error_bodies_keep_the_http_status() {
        let err = rest_error(StatusCode::SERVICE_UNAVAILABLE, "<html>maintenance</html>");

        assert_eq!(err.name, "HTTP_503");
        assert_eq!(err.message, "<html>maintenance</html>");
    }

    #[test]
    fn collection_records_carry_their_type() {
        let record = Map::from_iter([("LastName".to_string(), json!("Lovelace"))]);

        assert_eq!(
            typed_record("Contact", &record),
            json!({ "attributes": { "type": "Contact" }, "LastName": "Lovelace" })
        );
    }

    fn instance() -> Url {
        Url::parse("https://acme.my.salesforce.com").unwrap()
    }

    fn records(count: usize) -> Vec<Value> {
        (0..count).map(|i| json!({ "Id": format!("003{i:015}") })).collect()
    }

    fn page(records: Vec<Value>, next: Option<&str>) -> QueryPage {
        QueryPage {
            total_size: 12_000,
            done: next.is_none(),
            records,
            next_records_url: next.map(str::to_string),
        }
    }

    #[test]
    fn resource_names_stay_inside_their_path_segment() {
        let id = "../../query?q=SELECT Id,Password FROM User";
        let url = data_url(&instance(), "62.0", &["sobjects", "Contact", id]).unwrap();

        assert_eq!(url.query(), None);
        assert_eq!(url.host_str(), Some("acme.my.salesforce.com"));

        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 6);
        assert_eq!(&segments[..5], ["services", "data", "v62.0", "sobjects", "Contact"]);
        assert!(segments[5].starts_with("..%2F..%2Fquery%3F"));
    }

    #[test]
    fn upsert_and_describe_names_are_encoded() {
        let upsert = data_url(
            &instance(),
            "62.0",
            &["composite", "sobjects", "Contact", "Ext_Id__c/../../query"],
        )
        .unwrap();
        assert_eq!(
            upsert.path(),
            "/services/data/v62.0/composite/sobjects/Contact/Ext_Id__c%2F..%2F..%2Fquery"
        );

        let describe =
            data_url(&instance(), "62.0", &["sobjects", "Account#frag", "describe"]).unwrap();
        assert_eq!(describe.fragment(), None);
        assert_eq!(
            describe.path(),
            "/services/data/v62.0/sobjects/Account%23frag/describe"
        );
    }

    #[test]
    fn dot_segments_are_rejected() {
        for name in ["..", ".", ""] {
            let err = data_url(&instance(), "62.0", &["sobjects", name, "describe"]).unwrap_err();
            assert_eq!(err.name, "INVALID_PATH_SEGMENT");
        }
    }

    #[test]
    fn soap_endpoints_sit_under_the_base_url() {
        let base = Url::parse("https://login.salesforce.com/").unwrap();
        let url = endpoint(&base, ["services", "Soap", "u", "62.0"]).unwrap();

        assert_eq!(url.as_str(), "https://login.salesforce.com/services/Soap/u/62.0");
    }

    #[tokio::test]
    async fn single_page_queries_fetch_nothing_more() {
        let mut first = page(records(3), None);
        first.total_size = 3;

        let mut fetches = 0;

        let result = fetch_all(first, |_| {
            fetches += 1;
            std::future::ready(Ok(QueryPage::default()))
        })
        .await
        .unwrap();

        assert_eq!(fetches, 0);
        assert_eq!(result["totalSize"], 3);
        assert_eq!(result["done"], true);
        assert_eq!(result["records"].as_array().unwrap().len(), 3);
        assert!(result["nextRecordsUrl"].is_null());
    }

    #[tokio::test]
    async fn following_pages_are_appended_in_order() {
        let mut fetched = Vec::new();
        let first = page(records(2), Some("/services/data/v62.0/query/01g-2"));

        let result = fetch_all(first, |next| {
            fetched.push(next.clone());
            async move {
                Ok(match next.as_str() {
                    "/services/data/v62.0/query/01g-2" => {
                        page(records(2), Some("/services/data/v62.0/query/01g-4"))
                    }
                    _ => page(vec![json!({ "Id": "last" })], None),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(
            fetched,
            ["/services/data/v62.0/query/01g-2", "/services/data/v62.0/query/01g-4"]
        );
        assert_eq!(result["done"], true);
        let records = result["records"].as_array().unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[4]["Id"], "last");
    }

    #[tokio::test]
    async fn reading_stops_at_the_fetch_limit() {
        let mut fetches = 0;
        let first = page(records(3000), Some("/query/01g-1"));

        let result = fetch_all(first, |_| {
            fetches += 1;
            let next = format!("/query/01g-{}", fetches + 1);
            async move { Ok(page(records(3000), Some(&next))) }
        })
        .await
        .unwrap();

        // 3000 per page: the fourth page crosses the limit.
        assert_eq!(fetches, 3);
        assert_eq!(result["records"].as_array().unwrap().len(), MAX_FETCH);
        assert_eq!(result["done"], false);
        assert_eq!(result["nextRecordsUrl"], "/query/01g-4");
        assert_eq!(result["totalSize"], 12_000);
    }

    #[tokio::test]
    async fn page_failures_abort_the_query() {
        let first = page(records(1), Some("/query/01g-1"));

        let err = fetch_all(first, |_| async {
            Err(CrmError::new("INVALID_QUERY_LOCATOR", "invalid query locator"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.name, "INVALID_QUERY_LOCATOR");
    }

    #[test]
    fn collections_are_split_into_requests_of_two_hundred() {
        let records: Vec<Map<String, Value>> = (0..201)
            .map(|i| Map::from_iter([("LastName".to_string(), json!(format!("L{i}")))]))
            .collect();

        let bodies = collection_bodies("Contact", &records);

        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0]["records"].as_array().unwrap().len(), 200);
        assert_eq!(bodies[1]["records"].as_array().unwrap().len(), 1);
        assert_eq!(bodies[1]["records"][0]["LastName"], "L200");
        assert_eq!(bodies[0]["allOrNone"], false);
    }

    #[test]
    fn deletes_are_batched_by_two_hundred_ids() {
        let ids: Vec<String> = (0..201).map(|i| format!("003{i:015}")).collect();

        let batches = id_batches(&ids);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].split(',').count(), 200);
        assert_eq!(batches[1], ids[200]);
    }

    #[tokio::test]
    async fn operations_require_a_session() {
        let factory = SalesforceFactory::new(
            reqwest::Client::new(),
            SalesforceConfig {
                login_url: Url::parse("https://login.salesforce.com").unwrap(),
                instance_url: instance(),
                api_version: "62.0".into(),
            },
        );
        let conn = factory.connect();

        let err = conn.describe("Account").await.unwrap_err();
        assert_eq!(err.name, "NOT_AUTHENTICATED");

        // Nothing to release yet.
        conn.logout().await.unwrap();
    }
}
