use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use super::{Grid, RangeRef, SheetsClient, SheetsError};
use crate::config::SheetsConfig;

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Access tokens are refreshed this long before Google says they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: Option<SheetProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: Option<i64>,
    title: Option<String>,
}

/// Google Sheets v4 client authenticated as a service account.
///
/// Credentials are checked lazily: a client built from an incomplete config
/// only fails once a call is actually made, naming the missing variable.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    config: SheetsConfig,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleSheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: RwLock::new(None),
        }
    }

    fn spreadsheet_id(&self) -> Result<&str, SheetsError> {
        self.config
            .spreadsheet_id
            .as_deref()
            .ok_or(SheetsError::ConfigMissing("GOOGLE_SHEETS_ID (or SPREADSHEET_ID)"))
    }

    /// Returns a cached access token, minting a new one when it is close to expiry.
    async fn access_token(&self) -> Result<String, SheetsError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *self.token.write().await = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, SheetsError> {
        let email = self
            .config
            .client_email
            .as_deref()
            .ok_or(SheetsError::ConfigMissing("GOOGLE_CLIENT_EMAIL"))?;
        let private_key = self
            .config
            .private_key
            .as_deref()
            .ok_or(SheetsError::ConfigMissing("GOOGLE_PRIVATE_KEY"))?;

        let now = Utc::now();
        let claims = AssertionClaims {
            iss: email,
            scope: SCOPE,
            aud: &self.config.token_url,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = resp.json().await?;
        info!("Obtained Sheets access token for {}", email);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }

    /// Builds `{api_base}/spreadsheets/{id}/{segments...}` with each segment escaped.
    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let spreadsheet_id = self.spreadsheet_id()?;
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| SheetsError::InvalidResponse(format!("bad API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidResponse("API base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(SheetsError::Api { status, message })
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsClient for GoogleSheetsClient {
    async fn read_range(&self, range: &RangeRef) -> Result<Grid, SheetsError> {
        let a1 = range.to_string();
        debug!("Sheets read {}", a1);
        let url = self.url(&["values", &a1])?;
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;
        let body: ValueRange = Self::check(resp).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, range: &RangeRef, row: Vec<String>) -> Result<(), SheetsError> {
        let a1 = range.to_string();
        debug!("Sheets append {}", a1);
        let url = self.url(&["values", &format!("{}:append", a1)])?;
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn update_range(&self, range: &RangeRef, rows: Vec<Vec<String>>) -> Result<(), SheetsError> {
        let a1 = range.to_string();
        debug!("Sheets update {}", a1);
        let url = self.url(&["values", &a1])?;
        let token = self.access_token().await?;

        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": a1, "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete_rows(&self, table_id: i64, start: usize, end: usize) -> Result<(), SheetsError> {
        debug!("Sheets delete rows [{}, {}) in tab {}", start, end, table_id);
        let spreadsheet_id = self.spreadsheet_id()?.to_string();
        let mut url = self.url(&[])?;
        // batchUpdate is addressed as `spreadsheets/{id}:batchUpdate`
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidResponse("API base URL cannot have a path".to_string()))?
            .pop()
            .push(&format!("{}:batchUpdate", spreadsheet_id));
        let token = self.access_token().await?;

        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": table_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    }
                }
            }]
        });
        let resp = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn get_table_id(&self, table: &str) -> Result<i64, SheetsError> {
        let url = self.url(&[])?;
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets(properties(sheetId,title))")])
            .send()
            .await?;
        let meta: SpreadsheetMeta = Self::check(resp).await?.json().await?;

        meta.sheets
            .into_iter()
            .filter_map(|s| s.properties)
            .find(|p| p.title.as_deref() == Some(table))
            .and_then(|p| p.sheet_id)
            .ok_or_else(|| SheetsError::TableNotFound(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetsBackend;

    fn config(spreadsheet_id: Option<&str>) -> SheetsConfig {
        SheetsConfig {
            backend: SheetsBackend::Google,
            spreadsheet_id: spreadsheet_id.map(str::to_string),
            client_email: None,
            private_key: None,
            api_base: "https://sheets.googleapis.com/v4".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn builds_values_url_with_escaped_range() {
        let client = GoogleSheetsClient::new(config(Some("abc123")));
        let range = RangeRef::row("service orders", 2, 3).to_string();
        let url = client.url(&["values", &range]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/service%20orders!A2:C2"
        );
    }

    #[test]
    fn missing_spreadsheet_id_is_a_config_error() {
        let client = GoogleSheetsClient::new(config(None));
        let err = client.url(&[]).unwrap_err();
        assert!(matches!(err, SheetsError::ConfigMissing(_)));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let client = GoogleSheetsClient::new(config(Some("abc123")));
        let err = client.access_token().await.unwrap_err();
        assert!(matches!(err, SheetsError::ConfigMissing("GOOGLE_CLIENT_EMAIL")));
    }

    #[test]
    fn stringifies_non_string_cells() {
        assert_eq!(cell_to_string(json!(50000)), "50000");
        assert_eq!(cell_to_string(json!(true)), "true");
        assert_eq!(cell_to_string(Value::Null), "");
    }
}
