//! Google Calendar v3 events API over raw JSON.
//!
//! Events are read and written as untyped objects so fields we never
//! populate (conference data, colors, extended properties) survive an update.

use async_trait::async_trait;
use calsync_core::{RemoteCalendar, RemoteError, RemotePayload};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::session::Session;

pub struct GoogleCalendar {
    http: reqwest::Client,
    api_base: Url,
    session: Session,
}

fn send_updates(notify: bool) -> &'static str {
    if notify { "all" } else { "none" }
}

impl GoogleCalendar {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        session: Session,
    ) -> Result<Self, RemoteError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| RemoteError::Transport(format!("Invalid API base URL {api_base}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!("Invalid API base URL {api_base}")));
        }
        Ok(GoogleCalendar {
            http,
            api_base,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `{api_base}/calendars/{feed}/events[/{event_id}]`, with each segment percent-encoded.
    fn events_url(&self, feed: &str, event_id: Option<&str>) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["calendars", feed, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .bearer_auth(self.session.access_token())
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => RemoteError::NotFound,
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(error_text),
            _ => RemoteError::Http {
                status: status.as_u16(),
                message: error_text,
            },
        })
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<RemotePayload, RemoteError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Failed to parse event: {e}")))
    }
}

#[async_trait]
impl RemoteCalendar for GoogleCalendar {
    async fn get_event(&self, feed: &str, event_id: &str) -> Result<RemotePayload, RemoteError> {
        debug!(feed, event_id, "GET event");
        let url = self.events_url(feed, Some(event_id));
        self.send_json(self.http.get(url)).await
    }

    async fn insert_event(
        &self,
        feed: &str,
        payload: &RemotePayload,
        notify: bool,
    ) -> Result<RemotePayload, RemoteError> {
        debug!(feed, notify, "POST event");
        let url = self.events_url(feed, None);
        let request = self
            .http
            .post(url)
            .query(&[("sendUpdates", send_updates(notify))])
            .json(payload);
        self.send_json(request).await
    }

    async fn update_event(
        &self,
        feed: &str,
        event_id: &str,
        payload: &RemotePayload,
        notify: bool,
    ) -> Result<RemotePayload, RemoteError> {
        debug!(feed, event_id, notify, "PUT event");
        let url = self.events_url(feed, Some(event_id));
        let request = self
            .http
            .put(url)
            .query(&[("sendUpdates", send_updates(notify))])
            .json(payload);
        self.send_json(request).await
    }

    async fn delete_event(
        &self,
        feed: &str,
        event_id: &str,
        notify: bool,
    ) -> Result<(), RemoteError> {
        debug!(feed, event_id, notify, "DELETE event");
        let url = self.events_url(feed, Some(event_id));
        let request = self
            .http
            .delete(url)
            .query(&[("sendUpdates", send_updates(notify))]);
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn calendar(server: &MockServer) -> GoogleCalendar {
        GoogleCalendar::new(
            reqwest::Client::new(),
            &server.uri(),
            Session::new("access", 3600).unwrap(),
        )
        .unwrap()
    }

    fn payload(value: serde_json::Value) -> RemotePayload {
        RemotePayload::try_from(value).unwrap()
    }

    #[test]
    fn test_events_url_keeps_api_prefix() {
        let calendar = GoogleCalendar::new(
            reqwest::Client::new(),
            "https://www.googleapis.com/calendar/v3",
            Session::new("access", 3600).unwrap(),
        )
        .unwrap();

        assert_eq!(
            calendar.events_url("primary", Some("abc")).as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events/abc"
        );
        assert_eq!(
            calendar.events_url("team#holiday@group.v.calendar.google.com", None).as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team%23holiday@group.v.calendar.google.com/events"
        );
    }

    #[test]
    fn test_rejects_invalid_api_base() {
        let result = GoogleCalendar::new(
            reqwest::Client::new(),
            "not a url",
            Session::new("access", 3600).unwrap(),
        );
        assert!(matches!(result, Err(RemoteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_get_missing_event_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/feed/events/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = calendar(&server).get_event("feed", "missing").await;

        assert!(matches!(result, Err(RemoteError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_keeps_unknown_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/feed/events/evt"))
            .and(header("Authorization", "Bearer access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt",
                "status": "confirmed",
                "colorId": "5",
                "extendedProperties": { "private": { "room": "B2" } },
            })))
            .mount(&server)
            .await;

        let event = calendar(&server).get_event("feed", "evt").await.unwrap();

        assert_eq!(event.id(), Some("evt"));
        assert_eq!(event.get("colorId"), Some(&json!("5")));
        assert_eq!(
            event.get("extendedProperties"),
            Some(&json!({ "private": { "room": "B2" } }))
        );
    }

    #[tokio::test]
    async fn test_insert_sends_payload_and_notification_flag() {
        let server = MockServer::start().await;
        let body = json!({ "summary": "Checkup" });
        Mock::given(method("POST"))
            .and(path("/calendars/feed/events"))
            .and(header("Authorization", "Bearer access"))
            .and(query_param("sendUpdates", "all"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "new",
                "summary": "Checkup",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = calendar(&server)
            .insert_event("feed", &payload(body), true)
            .await
            .unwrap();

        assert_eq!(created.id(), Some("new"));
    }

    #[tokio::test]
    async fn test_update_replaces_whole_event() {
        let server = MockServer::start().await;
        let body = json!({ "id": "evt", "summary": "Moved", "colorId": "5" });
        Mock::given(method("PUT"))
            .and(path("/calendars/feed/events/evt"))
            .and(query_param("sendUpdates", "none"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let updated = calendar(&server)
            .update_event("feed", "evt", &payload(body.clone()), false)
            .await
            .unwrap();

        assert_eq!(updated.get("summary"), Some(&json!("Moved")));
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/calendars/feed/events/evt"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
            .mount(&server)
            .await;

        let result = calendar(&server)
            .update_event("feed", "evt", &payload(json!({})), false)
            .await;

        match result {
            Err(RemoteError::Unauthorized(message)) => {
                assert_eq!(message, "Invalid Credentials")
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/feed/events"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rateLimitExceeded"))
            .mount(&server)
            .await;

        let result = calendar(&server)
            .insert_event("feed", &payload(json!({})), false)
            .await;

        match result {
            Err(RemoteError::Http { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "rateLimitExceeded");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/feed/events/evt"))
            .and(query_param("sendUpdates", "all"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        calendar(&server).delete_event("feed", "evt", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_of_removed_event_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/feed/events/evt"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let result = calendar(&server).delete_event("feed", "evt", false).await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_calendar_id_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/en.usa%23holiday@group.v.calendar.google.com/events/evt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "evt" })))
            .expect(1)
            .mount(&server)
            .await;

        let event = calendar(&server)
            .get_event("en.usa#holiday@group.v.calendar.google.com", "evt")
            .await
            .unwrap();

        assert_eq!(event.id(), Some("evt"));
    }
}
