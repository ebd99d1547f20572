//! Webhook notifications to the parent app.
//!
//! Both pushes are fire-and-forget: they run on a detached thread, failures
//! are logged and never reach the caller.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Serialize;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::models::{APP_ID, DashboardSummary, UserId};

pub const SIGNATURE_HEADER: &str = "X-Ansiversa-Signature";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentNotification {
    pub user_id: UserId,
    pub app_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
}

impl ParentNotification {
    pub fn new(user_id: &UserId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id: user_id.clone(),
            app_id: APP_ID.to_string(),
            kind: APP_ID.to_string(),
            title: title.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub event: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPush {
    pub user_id: UserId,
    pub app_id: String,
    pub activity: Activity,
    pub summary: DashboardSummary,
}

/// Outbound side effects of study actions.
pub trait Notifier: Send + Sync {
    fn notify_parent(&self, notification: ParentNotification);
    fn push_activity(&self, push: ActivityPush);
}

/// Runs `task` on a detached thread and logs its failure.
pub fn fire_and_forget<F>(label: &'static str, task: F)
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name(format!("notify-{label}"))
        .spawn(move || {
            if let Err(e) = task() {
                log::warn!("{} failed: {}", label, e);
            }
        });
    if let Err(e) = spawned {
        log::warn!("{} skipped, could not spawn worker: {}", label, e);
    }
}

/// Posts JSON to the parent app's webhook endpoints.
pub struct WebhookNotifier {
    client: Client,
    parent_app_url: Option<String>,
    notification_override_url: Option<String>,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            parent_app_url: config.parent_app_url.clone(),
            notification_override_url: config.notification_webhook_url.clone(),
            secret: config.webhook_secret.clone(),
        })
    }

    pub fn notification_url(&self) -> Option<String> {
        if let Some(url) = &self.notification_override_url {
            return Some(url.clone());
        }
        self.parent_app_url
            .as_deref()
            .map(|base| format!("{}/api/webhooks/notifications.json", base.trim_end_matches('/')))
    }

    pub fn activity_url(&self) -> Option<String> {
        self.parent_app_url
            .as_deref()
            .map(|base| format!("{}/api/webhooks/flashnote-activity.json", base.trim_end_matches('/')))
    }

    fn post<T: Serialize + Send + 'static>(&self, label: &'static str, url: Option<String>, body: T) {
        let (Some(url), Some(secret)) = (url, self.secret.clone()) else {
            log::warn!("{} skipped: webhook URL or secret is not configured", label);
            return;
        };
        let client = self.client.clone();
        fire_and_forget(label, move || {
            client
                .post(&url)
                .header(SIGNATURE_HEADER, secret)
                .json(&body)
                .send()?
                .error_for_status()?;
            log::debug!("{} delivered to {}", label, url);
            Ok(())
        });
    }
}

impl Notifier for WebhookNotifier {
    fn notify_parent(&self, notification: ParentNotification) {
        self.post("notify_parent", self.notification_url(), notification);
    }

    fn push_activity(&self, push: ActivityPush) {
        self.post("push_activity", self.activity_url(), push);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps everything it was asked to send.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub notifications: Mutex<Vec<ParentNotification>>,
        pub activities: Mutex<Vec<ActivityPush>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify_parent(&self, notification: ParentNotification) {
            self.notifications.lock().unwrap().push(notification);
        }

        fn push_activity(&self, push: ActivityPush) {
            self.activities.lock().unwrap().push(push);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn notifier(parent: Option<&str>, override_url: Option<&str>) -> WebhookNotifier {
        let config = Config {
            parent_app_url: parent.map(str::to_string),
            notification_webhook_url: override_url.map(str::to_string),
            webhook_secret: Some("secret".to_string()),
            ..Config::default()
        };
        WebhookNotifier::from_config(&config).unwrap()
    }

    #[test]
    fn test_urls_from_parent_app() {
        let n = notifier(Some("https://parent.example/"), None);
        assert_eq!(
            n.notification_url().as_deref(),
            Some("https://parent.example/api/webhooks/notifications.json")
        );
        assert_eq!(
            n.activity_url().as_deref(),
            Some("https://parent.example/api/webhooks/flashnote-activity.json")
        );
    }

    #[test]
    fn test_override_url_wins() {
        let n = notifier(Some("https://parent.example"), Some("https://hooks.example/n"));
        assert_eq!(n.notification_url().as_deref(), Some("https://hooks.example/n"));
    }

    #[test]
    fn test_unconfigured_urls() {
        let n = notifier(None, None);
        assert_eq!(n.notification_url(), None);
        assert_eq!(n.activity_url(), None);
    }

    #[test]
    fn test_notification_payload_shape() {
        let user = UserId::new("alice").unwrap();
        let payload = ParentNotification::new(&user, "FlashNote deck created", "Deck ready.");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["userId"], "alice");
        assert_eq!(json["appId"], "flashnote");
        assert_eq!(json["type"], "flashnote");
        assert_eq!(json["body"], "Deck ready.");
    }

    #[test]
    fn test_fire_and_forget_swallows_errors() {
        let (tx, rx) = mpsc::channel();
        fire_and_forget("test", move || {
            tx.send(()).unwrap();
            Err(crate::error::FlashnoteError::Validation("boom".to_string()))
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
}
