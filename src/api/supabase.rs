//! Implements the `Store` trait against a hosted Supabase project: PostgREST for the `expenses`
//! table, Storage for the `receipts` bucket and GoTrue for the session.

use crate::api::{Filter, Session, SessionFile, Store, EXPENSES, RECEIPTS};
use crate::error::Res;
use crate::model::{date_key, Category, Expense, ExpenseChanges, ExpenseId, NewExpense};
use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

/// Implements the `Store` trait over HTTP. Every request carries the project's anon key and, once
/// signed in, the session's bearer token, which is refreshed shortly before it expires.
pub(crate) struct SupabaseStore {
    base: Url,
    anon_key: String,
    session: Option<SessionFile>,
    client: reqwest::Client,
}

/// The response body of a token grant.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStore {
    pub(crate) fn new(url: &str, anon_key: String, session: Option<SessionFile>) -> Res<Self> {
        let base = parse_base_url(url)?;
        Ok(Self {
            base,
            anon_key,
            session,
            client: reqwest::Client::new(),
        })
    }

    /// Exchanges an email and password for a new session.
    pub(crate) async fn sign_in(&self, email: &str, password: &str) -> Res<Session> {
        let url = self.auth_url("token?grant_type=password")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to send the sign-in request")?;
        let token: TokenResponse = parse_json(response, "sign in").await?;
        Ok(session_from_token(token))
    }

    /// Refreshes the stored session if its access token is about to expire.
    async fn ensure_fresh_session(&mut self) -> Res<()> {
        let refresh_token = match &self.session {
            Some(file) if file.session().needs_refresh(Utc::now()) => {
                file.session().refresh_token.clone()
            }
            _ => return Ok(()),
        };
        debug!("Access token is expiring, refreshing the session");
        let url = self.auth_url("token?grant_type=refresh_token")?;
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .context("Failed to send the token refresh request")?;
        let token: TokenResponse = parse_json(response, "refresh the session").await?;
        if let Some(file) = self.session.as_mut() {
            file.set_session(session_from_token(token));
            file.save().await?;
        }
        Ok(())
    }

    /// Adds the api key and bearer token to a request.
    async fn authorize(&mut self, request: RequestBuilder) -> Res<RequestBuilder> {
        self.ensure_fresh_session().await?;
        let bearer = match &self.session {
            Some(file) => file.session().access_token.clone(),
            None => self.anon_key.clone(),
        };
        Ok(request.header("apikey", &self.anon_key).bearer_auth(bearer))
    }

    fn rest_url(&self, pairs: &[(String, String)]) -> Res<Url> {
        let mut url = self
            .base
            .join(&format!("rest/v1/{EXPENSES}"))
            .context("Failed to build the table URL")?;
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(url)
    }

    fn storage_url(&self, path: &str) -> Res<Url> {
        self.base
            .join(&format!("storage/v1/{path}"))
            .with_context(|| format!("Failed to build the storage URL for '{path}'"))
    }

    fn auth_url(&self, path: &str) -> Res<Url> {
        self.base
            .join(&format!("auth/v1/{path}"))
            .with_context(|| format!("Failed to build the auth URL for '{path}'"))
    }
}

#[async_trait::async_trait]
impl Store for SupabaseStore {
    async fn query(&mut self, filter: Filter) -> Res<Vec<Expense>> {
        trace!("query {filter:?}");
        let url = self.rest_url(&query_pairs(filter))?;
        let request = self.authorize(self.client.get(url)).await?;
        let response = request
            .send()
            .await
            .context("Failed to send the expense query")?;
        parse_json(response, "fetch expenses").await
    }

    async fn insert(&mut self, expense: &NewExpense) -> Res<Expense> {
        trace!("insert {expense:?}");
        let url = self.rest_url(&[])?;
        let request = self
            .authorize(self.client.post(url))
            .await?
            .header("Prefer", "return=representation")
            .json(&row_body(expense)?);
        let response = request
            .send()
            .await
            .context("Failed to send the insert request")?;
        let rows: Vec<Expense> = parse_json(response, "insert the expense").await?;
        single_row(rows, "insert")
    }

    async fn update(&mut self, id: &ExpenseId, changes: &ExpenseChanges) -> Res<Expense> {
        trace!("update {id} {changes:?}");
        let url = self.rest_url(&[id_pair(id)])?;
        let request = self
            .authorize(self.client.patch(url))
            .await?
            .header("Prefer", "return=representation")
            .json(&row_body(changes)?);
        let response = request
            .send()
            .await
            .context("Failed to send the update request")?;
        let rows: Vec<Expense> = parse_json(response, "update the expense").await?;
        single_row(rows, "update")
    }

    async fn delete(&mut self, id: &ExpenseId) -> Res<()> {
        trace!("delete {id}");
        let url = self.rest_url(&[id_pair(id)])?;
        let request = self
            .authorize(self.client.delete(url))
            .await?
            .header("Prefer", "return=representation");
        let response = request
            .send()
            .await
            .context("Failed to send the delete request")?;
        let rows: Vec<Expense> = parse_json(response, "delete the expense").await?;
        single_row(rows, "delete")?;
        Ok(())
    }

    async fn upload_blob(&mut self, path: &str, bytes: &[u8], content_type: &str) -> Res<()> {
        trace!("upload_blob {path} ({} bytes)", bytes.len());
        let url = self.storage_url(&format!("object/{RECEIPTS}/{path}"))?;
        let request = self
            .authorize(self.client.post(url))
            .await?
            .header("Content-Type", content_type)
            .body(bytes.to_vec());
        let response = request
            .send()
            .await
            .context("Failed to send the receipt upload")?;
        check_status(response, "upload the receipt").await?;
        Ok(())
    }

    async fn delete_blob(&mut self, path: &str) -> Res<()> {
        trace!("delete_blob {path}");
        let url = self.storage_url(&format!("object/{RECEIPTS}"))?;
        let request = self
            .authorize(self.client.delete(url))
            .await?
            .json(&serde_json::json!({ "prefixes": [path] }));
        let response = request
            .send()
            .await
            .context("Failed to send the receipt deletion")?;
        check_status(response, "delete the receipt").await?;
        Ok(())
    }

    async fn signed_url(&mut self, path: &str, ttl_seconds: u64) -> Res<String> {
        trace!("signed_url {path}");
        let url = self.storage_url(&format!("object/sign/{RECEIPTS}/{path}"))?;
        let request = self
            .authorize(self.client.post(url))
            .await?
            .json(&serde_json::json!({ "expiresIn": ttl_seconds }));
        let response = request
            .send()
            .await
            .context("Failed to send the signed URL request")?;
        let signed: SignedUrlResponse = parse_json(response, "sign the receipt URL").await?;
        let url = self.storage_url(signed.signed_url.trim_start_matches('/'))?;
        Ok(url.to_string())
    }

    async fn current_user(&mut self) -> Res<Option<String>> {
        if self.session.is_none() {
            return Ok(None);
        }
        let url = self.auth_url("user")?;
        let request = self.authorize(self.client.get(url)).await?;
        let response = request
            .send()
            .await
            .context("Failed to send the user request")?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user: UserResponse = parse_json(response, "get the current user").await?;
        Ok(Some(user.id))
    }
}

/// Parses the project URL, making sure it ends with a slash so that `Url::join` appends to it.
fn parse_base_url(url: &str) -> Res<Url> {
    let with_slash = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    };
    let base = Url::parse(&with_slash).with_context(|| format!("Invalid Supabase URL '{url}'"))?;
    if !matches!(base.scheme(), "http" | "https") {
        bail!("The Supabase URL must be http or https, got '{url}'");
    }
    Ok(base)
}

/// The PostgREST query parameters for a filtered, creation-ordered select.
fn query_pairs(filter: Filter) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), "*".to_string())];
    match filter {
        Filter::On(date) => pairs.push(("date".to_string(), format!("eq.{}", date_key(date)))),
        Filter::Between { start, end } => {
            pairs.push(("date".to_string(), format!("gte.{}", date_key(start))));
            pairs.push(("date".to_string(), format!("lt.{}", date_key(end))));
        }
    }
    pairs.push(("order".to_string(), "created_at.asc".to_string()));
    pairs
}

fn id_pair(id: &ExpenseId) -> (String, String) {
    ("id".to_string(), format!("eq.{id}"))
}

fn session_from_token(token: TokenResponse) -> Session {
    Session {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
        user_id: token.user.id,
    }
}

/// Serializes a row for PostgREST. The hosted table keeps categories as their Japanese labels.
fn row_body<T: Serialize>(row: &T) -> Res<serde_json::Value> {
    let mut body = serde_json::to_value(row).context("Unable to serialize the expense")?;
    if let Some(category) = body.get_mut("category") {
        let label = category
            .as_str()
            .map(|name| Category::from_stored(name).label().to_string());
        if let Some(label) = label {
            *category = serde_json::Value::String(label);
        }
    }
    Ok(body)
}

fn single_row(rows: Vec<Expense>, operation: &str) -> Res<Expense> {
    rows.into_iter()
        .next()
        .with_context(|| format!("The {operation} returned no row, it may not exist or be visible"))
}

/// Fails with the response body if the status is not a success.
async fn check_status(response: Response, action: &str) -> Res<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("Failed to {action}, the server responded with {status}: {body}")
}

async fn parse_json<T>(response: Response, action: &str) -> Res<T>
where
    T: serde::de::DeserializeOwned,
{
    let response = check_status(response, action).await?;
    response
        .json()
        .await
        .with_context(|| format!("Failed to parse the response to {action}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use chrono::NaiveDate;

    fn store() -> SupabaseStore {
        SupabaseStore::new("https://abc.supabase.co", "anon".to_string(), None).unwrap()
    }

    #[test]
    fn test_range_query_url() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let url = store()
            .rest_url(&query_pairs(Filter::Between { start, end }))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/expenses?select=*&date=gte.2024-12-01&date=lt.2025-01-01&order=created_at.asc"
        );
    }

    #[test]
    fn test_day_query_url() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let url = store().rest_url(&query_pairs(Filter::On(day))).unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/expenses?select=*&date=eq.2024-05-03&order=created_at.asc"
        );
    }

    #[test]
    fn test_id_filter_url() {
        let url = store()
            .rest_url(&[id_pair(&ExpenseId::new("abc-123"))])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/expenses?id=eq.abc-123"
        );
    }

    #[test]
    fn test_storage_and_auth_urls() {
        let s = store();
        assert_eq!(
            s.storage_url("object/receipts/user-1/e_1.jpg")
                .unwrap()
                .as_str(),
            "https://abc.supabase.co/storage/v1/object/receipts/user-1/e_1.jpg"
        );
        assert_eq!(
            s.auth_url("token?grant_type=password").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_base_url_with_path_and_trailing_slash() {
        let s = SupabaseStore::new("http://localhost:54321/", "anon".to_string(), None).unwrap();
        assert_eq!(
            s.auth_url("user").unwrap().as_str(),
            "http://localhost:54321/auth/v1/user"
        );
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(SupabaseStore::new("not a url", "anon".to_string(), None).is_err());
        assert!(SupabaseStore::new("ftp://example.com", "anon".to_string(), None).is_err());
    }

    #[test]
    fn test_token_response_to_session() {
        let json = r#"{
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": "user-1", "email": "me@example.com" }
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        let session = session_from_token(token);
        assert_eq!(session.user_id, "user-1");
        assert!(!session.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_insert_body_uses_labels() {
        let expense = NewExpense::new(
            NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            Amount::new(1200),
            Category::DailyGoods,
            Some("detergent".to_string()),
        );
        assert_eq!(
            row_body(&expense).unwrap(),
            serde_json::json!({
                "date": "2024-05-03",
                "amount": 1200,
                "category": "日用品",
                "description": "detergent"
            })
        );
    }

    #[test]
    fn test_update_body_uses_labels() {
        let changes = ExpenseChanges::default().category(Category::Food);
        assert_eq!(
            row_body(&changes).unwrap(),
            serde_json::json!({ "category": "食費" })
        );
        let changes = ExpenseChanges::default().amount(Amount::new(500));
        assert_eq!(row_body(&changes).unwrap(), serde_json::json!({ "amount": 500 }));
    }

    #[test]
    fn test_missing_row_is_an_error() {
        let err = single_row(Vec::new(), "delete").unwrap_err();
        assert!(err.to_string().contains("The delete returned no row"));
    }

    #[tokio::test]
    async fn test_current_user_without_session() {
        let mut s = store();
        assert_eq!(s.current_user().await.unwrap(), None);
    }
}
