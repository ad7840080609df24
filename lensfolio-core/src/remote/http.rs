//! Supabase-style REST backend
//!
//! Rows go through PostgREST under `/rest/v1/<table>`, media through the
//! storage API under `/storage/v1/object/<bucket>/<path>`, and password
//! sign-in through `/auth/v1/token`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{RemoteClient, RemoteError, RowFilter, RowOrder};
use crate::ids::{EntityId, PrincipalId};
use crate::model::{DurableRef, Principal};

#[derive(Debug, Clone)]
struct AuthSession {
    access_token: String,
    user_id: PrincipalId,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
}

pub struct HttpRemote {
    client: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: RwLock::new(None),
        }
    }

    /// Per-request timeout on the underlying HTTP client
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    /// Exchange email and password for a session; later requests act as that user.
    #[instrument(level = "debug", skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, RemoteError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network)?;
        let token: TokenResponse = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::rejected(format!("unreadable token response: {e}")))?;

        let user_id = PrincipalId::from_string(token.user.id);
        info!(user_id = %user_id, "signed in");
        *self.session.write().unwrap() = Some(AuthSession {
            access_token: token.access_token,
            user_id: user_id.clone(),
        });
        Ok(Principal::Known(user_id))
    }

    pub fn sign_out(&self) {
        *self.session.write().unwrap() = None;
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encode_path(path)
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }
}

fn network(err: reqwest::Error) -> RemoteError {
    RemoteError::Network(err.to_string())
}

/// Keep `/` separators, encode each segment
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn checked(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(RemoteError::Rejected {
        status: Some(status.as_u16()),
        message: body,
    })
}

#[async_trait]
impl RemoteClient for HttpRemote {
    #[instrument(level = "debug", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<DurableRef, RemoteError> {
        let response = self
            .authorized(self.client.post(self.object_url(bucket, path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(network)?;
        checked(response).await?;
        Ok(DurableRef::new(bucket, path))
    }

    fn public_url(&self, media: &DurableRef) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&media.bucket),
            encode_path(&media.path)
        )
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_blob(&self, media: &DurableRef) -> Result<(), RemoteError> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            urlencoding::encode(&media.bucket)
        );
        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": [media.path] }))
            .send()
            .await
            .map_err(network)?;
        checked(response).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, record))]
    async fn insert_row(&self, table: &str, record: Value) -> Result<Value, RemoteError> {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<Value> = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::rejected(format!("unreadable insert response: {e}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::rejected("insert returned no row"))
    }

    #[instrument(level = "debug", skip(self, fields))]
    async fn update_row(
        &self,
        table: &str,
        id: &EntityId,
        fields: Value,
    ) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(table), urlencoding::encode(id.as_str()));
        let response = self
            .authorized(self.client.patch(url))
            .json(&fields)
            .send()
            .await
            .map_err(network)?;
        checked(response).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_row(&self, table: &str, id: &EntityId) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(table), urlencoding::encode(id.as_str()));
        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .map_err(network)?;
        checked(response).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn query_rows(
        &self,
        table: &str,
        filter: &RowFilter,
        order: &RowOrder,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut query = vec!["select=*".to_string()];
        for (column, value) in &filter.eq {
            query.push(format!(
                "{}=eq.{}",
                urlencoding::encode(column),
                urlencoding::encode(value)
            ));
        }
        query.push(format!(
            "order={}.{}",
            urlencoding::encode(&order.column),
            if order.descending { "desc" } else { "asc" }
        ));
        let url = format!("{}?{}", self.table_url(table), query.join("&"));

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<Value> = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::rejected(format!("unreadable rows: {e}")))?;
        debug!(table, rows = rows.len(), "queried rows");
        Ok(rows)
    }

    async fn current_principal(&self) -> Principal {
        match self.session.read().unwrap().as_ref() {
            Some(session) => Principal::Known(session.user_id.clone()),
            None => Principal::Anonymous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let remote = HttpRemote::new("https://abc.supabase.co/", "anon");
        assert_eq!(
            remote.public_url(&DurableRef::new("photos", "users/u1/a b.jpg")),
            "https://abc.supabase.co/storage/v1/object/public/photos/users/u1/a%20b.jpg"
        );
        assert_eq!(remote.table_url("photos"), "https://abc.supabase.co/rest/v1/photos");
    }

    #[tokio::test]
    async fn test_anonymous_until_sign_in() {
        let remote = HttpRemote::new("https://abc.supabase.co", "anon");
        assert_eq!(remote.current_principal().await, Principal::Anonymous);
    }
}
