//! Type definitions and helpers for the WeCom API.

use super::{
    auth::{Account, CachedToken},
    error::WeComError,
};
use once_cell::sync::Lazy;
use reqwest::{header, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// The base URL of the WeCom API.
pub const API_BASE: &str = "https://qyapi.weixin.qq.com";

/// Exchanges the corp ID and application secret for an access token.
pub const GET_ACCESS_TOKEN: &str = "GetAccessToken";

/// Sends a message as the application.
pub const MESSAGE_SEND: &str = "MessageSend";

/// What a query builder may draw on when rendering a request URL.
pub struct QueryContext<'a> {
    pub account: &'a Account,
    pub token: Option<&'a str>,
}

type QueryBuilder = fn(&QueryContext<'_>) -> Vec<(&'static str, String)>;

/// A single entry in the operation registry.
pub struct Operation {
    pub method: Method,
    pub path: &'static str,
    query: QueryBuilder,
}

impl Operation {
    fn query_pairs(&self, cx: &QueryContext<'_>) -> Vec<(&'static str, String)> {
        (self.query)(cx)
    }
}

/// Every operation the client knows how to dispatch, keyed by name. Nothing
/// is registered after startup.
static OPERATIONS: Lazy<HashMap<&'static str, Operation>> = Lazy::new(|| {
    HashMap::from([
        (
            GET_ACCESS_TOKEN,
            Operation {
                method: Method::GET,
                path: "/cgi-bin/gettoken",
                query: |cx| {
                    vec![
                        ("corpid", cx.account.corp_id().to_owned()),
                        ("corpsecret", cx.account.secret().to_owned()),
                    ]
                },
            },
        ),
        (
            MESSAGE_SEND,
            Operation {
                method: Method::POST,
                path: "/cgi-bin/message/send",
                query: |cx| vec![("access_token", cx.token.unwrap_or_default().to_owned())],
            },
        ),
    ])
});

/// Look up a registered operation by name.
pub fn operation(name: &str) -> Result<&'static Operation, WeComError> {
    OPERATIONS
        .get(name)
        .ok_or_else(|| WeComError::UnknownOperation(name.to_owned()))
}

/// WeCom's API wraps every response in a common envelope, representing
/// whether a request was successful alongside operation-specific fields.
///
/// ```json
/// {
///     "errcode": 0,
///     "errmsg": "ok",
///     "access_token": "accesstoken000001",
///     "expires_in": 7200
/// }
/// ```
///
/// ```json
/// {
///     "errcode": 40001,
///     "errmsg": "invalid credential"
/// }
/// ```
// Operation-specific fields must tolerate being absent, as they are on
// failure.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    /// Convert a non-zero `errcode` into [WeComError::Api].
    pub fn into_result(self) -> Result<T, WeComError> {
        match self.errcode {
            0 => Ok(self.data),
            code => Err(WeComError::Api {
                code,
                message: self.errmsg,
            }),
        }
    }
}

/// A client for a single WeCom application. Holds a connection pool
/// internally, as per [reqwest::Client], along with the cached access token.
///
/// Operations which may refresh the token take `&mut self`; share a client
/// between tasks behind a mutex.
pub struct WeComClient {
    base_url: String,
    pub(super) account: Account,
    pub(super) token: Option<CachedToken>,
    http: reqwest::Client,
}

impl WeComClient {
    /// A client talking to the public WeCom API.
    pub fn new(account: Account) -> Self {
        Self::with_base_url(account, API_BASE)
    }

    pub fn with_base_url<T: ToString>(account: Account, base_url: T) -> Self {
        Self {
            base_url: base_url.to_string(),
            account,
            token: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Execute the named operation and decode its response, refreshing the
    /// access token first unless the operation is the token fetch itself.
    ///
    /// The decoded envelope is returned as-is; see [Envelope::into_result].
    pub async fn execute<B, R>(&mut self, name: &str, body: Option<&B>) -> Result<R, WeComError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let op = operation(name)?;

        if name != GET_ACCESS_TOKEN {
            self.ensure_token().await?;
        }

        debug!(operation = name, "Dispatching WeCom request");
        self.dispatch(op, body).await
    }

    /// Issue a single request for `op` with whatever token is cached.
    pub(super) async fn dispatch<B, R>(
        &self,
        op: &Operation,
        body: Option<&B>,
    ) -> Result<R, WeComError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url_for(op)?;
        let mut req = self.http.request(op.method.clone(), url);

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(WeComError::Encode)?;
            req = req
                .header(header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        let res = req.send().await?.bytes().await?;

        serde_json::from_slice(&res).map_err(WeComError::Decode)
    }

    fn url_for(&self, op: &Operation) -> Result<Url, WeComError> {
        let mut url = Url::parse(&(self.base_url.to_owned() + op.path))?;

        let cx = QueryContext {
            account: &self.account,
            token: self.token.as_ref().map(|t| t.token.0.as_str()),
        };
        url.query_pairs_mut().extend_pairs(op.query_pairs(&cx));

        Ok(url)
    }
}
