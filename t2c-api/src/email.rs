//! Outgoing email
//!
//! Mail leaves the process through a transactional-email HTTP gateway; the
//! dispatcher posts `{to, subject, body, from}` JSON to the configured
//! endpoint. Without a gateway URL (local runs, tests) the null variant
//! logs the message instead. Every call site is fire-and-forget: a failed
//! send is logged and never rolls back the state transition that caused it.

use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use t2c_common::config::AppConfig;
use tracing::{debug, warn};

use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
}

#[derive(Clone)]
pub enum EmailDispatcher {
    Http(HttpEmailDispatcher),
    /// Logs instead of sending; used when no gateway is configured
    Null,
}

impl EmailDispatcher {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match &config.email_gateway_url {
            Some(url) => Ok(EmailDispatcher::Http(HttpEmailDispatcher::new(
                url.clone(),
                config.email_from.clone(),
            )?)),
            None => Ok(EmailDispatcher::Null),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        match self {
            EmailDispatcher::Http(http) => http.send(to, subject, body).await,
            EmailDispatcher::Null => {
                debug!("email (not sent) to {}: {}", to, subject);
                Ok(())
            }
        }
    }

    /// Fire-and-forget send: failures are logged, never propagated.
    pub async fn send_logged(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.send(to, subject, body).await {
            warn!("failed to send email to {}: {}", to, e);
        }
    }
}

#[derive(Clone)]
pub struct HttpEmailDispatcher {
    client: reqwest::Client,
    gateway_url: String,
    from: Option<String>,
}

impl HttpEmailDispatcher {
    pub fn new(gateway_url: String, from: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Email(format!("cannot build email client: {e}")))?;
        Ok(Self {
            client,
            gateway_url,
            from,
        })
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let payload = OutgoingEmail {
            to,
            subject,
            body,
            from: self.from.as_deref(),
        };
        let response = self
            .client
            .post(&self.gateway_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Email(format!("gateway request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Email(format!(
                "gateway returned {}",
                response.status()
            )));
        }
        debug!("email sent to {}: {}", to, subject);
        Ok(())
    }
}

// Template functions: (subject, plain-text body) pairs.

pub fn booking_confirmation_email(
    first_name: &str,
    centre_name: &str,
    date: NaiveDate,
    time: chrono::NaiveTime,
) -> (String, String) {
    (
        "Your Trash2Cash Appointment is Confirmed".to_string(),
        format!(
            "Dear {first_name},\n\n\
             Your appointment at {centre_name} on {} at {} has been confirmed.\n\n\
             Thank you for using Trash2Cash!",
            date.format("%-d %b %Y"),
            time.format("%H:%M"),
        ),
    )
}

pub fn reminder_email(
    first_name: &str,
    centre_name: &str,
    date: NaiveDate,
    time: chrono::NaiveTime,
) -> (String, String) {
    (
        format!("Reminder: Your Trash2Cash Appointment at {centre_name}"),
        format!(
            "Dear {first_name},\n\n\
             This is a reminder of your upcoming appointment at {centre_name} \
             on {} at {}.\n\n\
             Thank you for using Trash2Cash!",
            date.format("%-d %b %Y"),
            time.format("%H:%M"),
        ),
    )
}

pub fn arrival_confirmation_email(first_name: &str, centre_name: &str) -> (String, String) {
    (
        "Your Items Have Arrived".to_string(),
        format!(
            "Dear {first_name},\n\n\
             Your recyclables have been delivered to {centre_name}.\n\n\
             Thank you for using Trash2Cash!"
        ),
    )
}

pub fn otp_email(first_name: &str, code: &str) -> (String, String) {
    (
        "Trash2Cash Registration Verification".to_string(),
        format!(
            "Dear {first_name},\n\n\
             Your verification code is {code}. It expires in 5 minutes.\n\n\
             Thank you for using Trash2Cash!"
        ),
    )
}

pub fn voucher_expiry_email(
    first_name: &str,
    voucher_name: &str,
    expires: NaiveDate,
) -> (String, String) {
    (
        "Your Trash2Cash Voucher is Expiring Soon".to_string(),
        format!(
            "Dear {first_name},\n\n\
             Your voucher \"{voucher_name}\" expires on {}. \
             Redeem it before it's gone!\n\n\
             Thank you for using Trash2Cash!",
            expires.format("%-d %b %Y"),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn booking_confirmation_names_centre_and_slot() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        let (subject, body) = booking_confirmation_email("Ada", "Greenpoint Depot", date, time);
        assert!(subject.contains("Confirmed"));
        assert!(body.starts_with("Dear Ada,"));
        assert!(body.contains("Greenpoint Depot"));
        assert!(body.contains("14 Mar 2026"));
        assert!(body.contains("10:30"));
    }

    #[test]
    fn otp_email_carries_the_code() {
        let (subject, body) = otp_email("Ada", "042917");
        assert!(subject.contains("Verification"));
        assert!(body.contains("042917"));
    }

    #[tokio::test]
    async fn null_dispatcher_always_succeeds() {
        let dispatcher = EmailDispatcher::Null;
        dispatcher
            .send("someone@example.com", "subject", "body")
            .await
            .unwrap();
    }
}
