//! Send structured messages to users, departments or tags.
//!
//! <https://developer.work.weixin.qq.com/document/path/90236>

use super::{
    api::{Envelope, WeComClient, MESSAGE_SEND},
    error::WeComError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The recipient WeCom expands to every member visible to the application.
pub const ALL_USERS: &str = "@all";

/// A message as WeCom expects it, sharing recipient fields and the sending
/// application across every [MessageBody].
///
/// Recipient lists are `|`-separated. No validation happens here; WeCom
/// reports what it rejects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(rename = "touser")]
    pub to_user: String,
    #[serde(rename = "toparty")]
    pub to_party: String,
    #[serde(rename = "totag")]
    pub to_tag: String,
    #[serde(rename = "agentid")]
    pub agent_id: i64,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// The variant payload, tagged by `msgtype`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum MessageBody {
    Text {
        text: Content,
        safe: u8,
        enable_id_trans: u8,
    },
    Markdown {
        markdown: Content,
    },
    /// Refers to media previously uploaded to WeCom.
    Image {
        image: Media,
        safe: u8,
        enable_id_trans: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Media {
    pub media_id: String,
}

impl Message {
    fn new(body: MessageBody) -> Self {
        Self {
            to_user: String::new(),
            to_party: String::new(),
            to_tag: String::new(),
            agent_id: 0,
            body,
        }
    }

    pub fn text<T: Into<String>>(content: T) -> Self {
        Self::new(MessageBody::Text {
            text: Content {
                content: content.into(),
            },
            safe: 0,
            enable_id_trans: 0,
        })
    }

    pub fn markdown<T: Into<String>>(content: T) -> Self {
        Self::new(MessageBody::Markdown {
            markdown: Content {
                content: content.into(),
            },
        })
    }

    pub fn image<T: Into<String>>(media_id: T) -> Self {
        Self::new(MessageBody::Image {
            image: Media {
                media_id: media_id.into(),
            },
            safe: 0,
            enable_id_trans: 0,
        })
    }

    /// The `msgtype` discriminant this message serializes with.
    pub fn msg_type(&self) -> &'static str {
        match self.body {
            MessageBody::Text { .. } => "text",
            MessageBody::Markdown { .. } => "markdown",
            MessageBody::Image { .. } => "image",
        }
    }

    /// Address the message to the given users, or to everyone if none are
    /// given.
    pub fn to_users(mut self, users: &[&str]) -> Self {
        self.to_user = fmt_users(users);
        self
    }

    pub fn to_parties(mut self, parties: &[&str]) -> Self {
        self.to_party = parties.join("|");
        self
    }

    pub fn to_tags(mut self, tags: &[&str]) -> Self {
        self.to_tag = tags.join("|");
        self
    }

    pub fn with_agent_id(mut self, agent_id: i64) -> Self {
        self.agent_id = agent_id;
        self
    }
}

/// Join users into WeCom's recipient syntax, e.g. `alice|bob`, defaulting to
/// [ALL_USERS].
fn fmt_users(users: &[&str]) -> String {
    if users.is_empty() {
        ALL_USERS.to_owned()
    } else {
        users.join("|")
    }
}

/// Recipients WeCom refused, returned alongside an otherwise successful send.
///
/// <https://developer.work.weixin.qq.com/document/path/90236>
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct SendReceipt {
    #[serde(
        rename = "invaliduser",
        default,
        deserialize_with = "crate::de::pipe_separated"
    )]
    pub invalid_users: Vec<String>,
    #[serde(
        rename = "invalidparty",
        default,
        deserialize_with = "crate::de::pipe_separated"
    )]
    pub invalid_parties: Vec<String>,
    #[serde(
        rename = "invalidtag",
        default,
        deserialize_with = "crate::de::pipe_separated"
    )]
    pub invalid_tags: Vec<String>,
}

impl SendReceipt {
    /// Whether every recipient was accepted.
    pub fn is_clean(&self) -> bool {
        self.invalid_users.is_empty()
            && self.invalid_parties.is_empty()
            && self.invalid_tags.is_empty()
    }
}

impl WeComClient {
    /// Send a message, converting a non-zero `errcode` into an error.
    pub async fn send(&mut self, msg: &Message) -> Result<SendReceipt, WeComError> {
        let res: Envelope<SendReceipt> = self.execute(MESSAGE_SEND, Some(msg)).await?;
        let receipt = res.into_result()?;

        if receipt.is_clean() {
            info!(msgtype = msg.msg_type(), "Sent WeCom message");
        } else {
            warn!(
                invalid_users = ?receipt.invalid_users,
                invalid_parties = ?receipt.invalid_parties,
                invalid_tags = ?receipt.invalid_tags,
                "WeCom rejected some recipients"
            );
        }

        Ok(receipt)
    }

    /// Send a text message as this application to the given users, or to
    /// everyone if none are given.
    pub async fn send_text_to_users<T: Into<String>>(
        &mut self,
        content: T,
        users: &[&str],
    ) -> Result<SendReceipt, WeComError> {
        let msg = Message::text(content)
            .to_users(users)
            .with_agent_id(self.account.agent_id());

        self.send(&msg).await
    }

    /// As [Self::send_text_to_users], but for markdown.
    pub async fn send_markdown_to_users<T: Into<String>>(
        &mut self,
        content: T,
        users: &[&str],
    ) -> Result<SendReceipt, WeComError> {
        let msg = Message::markdown(content)
            .to_users(users)
            .with_agent_id(self.account.agent_id());

        self.send(&msg).await
    }

    /// As [Self::send_text_to_users], but for an already uploaded image.
    pub async fn send_image_to_users<T: Into<String>>(
        &mut self,
        media_id: T,
        users: &[&str],
    ) -> Result<SendReceipt, WeComError> {
        let msg = Message::image(media_id)
            .to_users(users)
            .with_agent_id(self.account.agent_id());

        self.send(&msg).await
    }
}


#[cfg(test)]
mod tests_send {
    use super::*;
    use crate::wecom::auth::Account;
    use mockito::Matcher;
    use serde_json::json;

    const TOKEN_OK: &str =
        r#"{"errcode":0,"errmsg":"ok","access_token":"T1","expires_in":7200}"#;

    const SEND_OK: &str = r#"{"errcode":0,"errmsg":"ok"}"#;

    fn client(base_url: String) -> WeComClient {
        WeComClient::with_base_url(Account::new("corp", 1000002, "secret"), base_url)
    }

    async fn server() -> mockito::ServerGuard {
        mockito::Server::new_async().await
    }

    async fn token_mock(srv: &mut mockito::ServerGuard, body: &str) -> mockito::Mock {
        srv.mock("GET", "/cgi-bin/gettoken")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("corpid".into(), "corp".into()),
                Matcher::UrlEncoded("corpsecret".into(), "secret".into()),
            ]))
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_send_text_to_everyone() {
        let mut srv = server().await;

        let token_mock = token_mock(&mut srv, TOKEN_OK).await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::UrlEncoded("access_token".into(), "T1".into()))
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "touser": "@all",
                "msgtype": "text",
                "agentid": 1000002,
                "text": { "content": "hi" }
            })))
            .with_body(SEND_OK)
            .expect(1)
            .create_async()
            .await;

        let res = client(srv.url()).send_text_to_users("hi", &[]).await;

        token_mock.assert_async().await;
        send_mock.assert_async().await;
        assert_eq!(res.unwrap(), SendReceipt::default());
    }

    #[tokio::test]
    async fn test_send_markdown_to_users() {
        let mut srv = server().await;

        let token_mock = token_mock(&mut srv, TOKEN_OK).await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::UrlEncoded("access_token".into(), "T1".into()))
            .match_body(Matcher::PartialJson(json!({
                "touser": "alice|bob",
                "msgtype": "markdown",
                "markdown": { "content": "**hi**" }
            })))
            .with_body(SEND_OK)
            .expect(1)
            .create_async()
            .await;

        let res = client(srv.url())
            .send_markdown_to_users("**hi**", &["alice", "bob"])
            .await;

        token_mock.assert_async().await;
        send_mock.assert_async().await;
        assert!(res.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_token_reused_across_sends() {
        let mut srv = server().await;

        let token_mock = token_mock(&mut srv, TOKEN_OK).await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::UrlEncoded("access_token".into(), "T1".into()))
            .with_body(SEND_OK)
            .expect(2)
            .create_async()
            .await;

        let mut c = client(srv.url());
        c.send_text_to_users("one", &["alice"]).await.unwrap();
        c.send_image_to_users("MEDIA_ID", &["alice"]).await.unwrap();

        token_mock.assert_async().await;
        send_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_credentials_skip_send() {
        let mut srv = server().await;

        let token_mock = token_mock(
            &mut srv,
            r#"{"errcode":40001,"errmsg":"invalid credential"}"#,
        )
        .await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let res = client(srv.url()).send_text_to_users("hi", &[]).await;

        token_mock.assert_async().await;
        send_mock.assert_async().await;
        assert!(matches!(
            res,
            Err(WeComError::Api { code: 40001, message }) if message == "invalid credential"
        ));
    }

    #[tokio::test]
    async fn test_send_api_error() {
        let mut srv = server().await;

        let token_mock = token_mock(&mut srv, TOKEN_OK).await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::Any)
            .with_body(r#"{"errcode":81013,"errmsg":"user & party & tag all invalid"}"#)
            .create_async()
            .await;

        let res = client(srv.url()).send_text_to_users("hi", &["nobody"]).await;

        token_mock.assert_async().await;
        send_mock.assert_async().await;
        assert_eq!(res.unwrap_err().api_code(), Some(81013));
    }

    #[tokio::test]
    async fn test_partially_invalid_recipients() {
        let mut srv = server().await;

        let token_mock = token_mock(&mut srv, TOKEN_OK).await;

        let send_mock = srv
            .mock("POST", "/cgi-bin/message/send")
            .match_query(Matcher::Any)
            .with_body(
                r#"{
                    "errcode": 0,
                    "errmsg": "ok",
                    "invaliduser": "carol|dave",
                    "invalidparty": "",
                    "invalidtag": "9"
                }"#,
            )
            .create_async()
            .await;

        let receipt = client(srv.url())
            .send_text_to_users("hi", &["alice", "carol", "dave"])
            .await
            .unwrap();

        token_mock.assert_async().await;
        send_mock.assert_async().await;
        assert!(!receipt.is_clean());
        assert_eq!(receipt.invalid_users, vec!["carol", "dave"]);
        assert!(receipt.invalid_parties.is_empty());
        assert_eq!(receipt.invalid_tags, vec!["9"]);
    }
}
