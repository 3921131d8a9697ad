use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Sends through a Resend-compatible HTTP mail API.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await
            .context("mail api request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("mail api returned {status}: {body}");
        }
        Ok(())
    }
}

/// Used when no mail API key is configured and in tests: logs the message
/// instead of delivering it.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "mail transport disabled, logging only");
        Ok(())
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin:0;padding:0;background:#f4f5f7;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:520px;margin:32px auto;background:#ffffff;border-radius:8px;padding:32px;">
      <h2 style="margin-top:0;color:#1a1a2e;">{title}</h2>
      {body}
      <p style="color:#8a8f98;font-size:12px;margin-top:32px;">
        If you did not request this email you can safely ignore it.
      </p>
    </div>
  </body>
</html>"#
    )
}

pub fn registration_email(to: &str, name: &str, otp: &str) -> Email {
    let body = format!(
        "<p>Hi {name},</p>\
         <p>Welcome to Hirelane! Use the code below to verify your email address.</p>\
         <p style=\"font-size:28px;letter-spacing:6px;font-weight:bold;\">{otp}</p>\
         <p>This code will expire in 10 minutes.</p>"
    );
    Email {
        to: to.to_string(),
        subject: "Verify your email address".to_string(),
        html: layout("Verify your email address", &body),
    }
}

pub fn forgot_password_email(to: &str, name: &str, otp: &str) -> Email {
    let body = format!(
        "<p>Hi {name},</p>\
         <p>We received a request to reset your password. Use this code to continue:</p>\
         <p style=\"font-size:28px;letter-spacing:6px;font-weight:bold;\">{otp}</p>\
         <p>This code will expire in 10 minutes.</p>"
    );
    Email {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: layout("Reset your password", &body),
    }
}

pub fn reset_confirmation_email(to: &str, name: &str) -> Email {
    let body = format!(
        "<p>Hi {name},</p>\
         <p>Your password has been reset. You can now log in with your new password.</p>\
         <p>If this was not you, please reset your password again immediately.</p>"
    );
    Email {
        to: to.to_string(),
        subject: "Your password was reset".to_string(),
        html: layout("Password reset", &body),
    }
}

pub fn application_status_email(
    to: &str,
    name: &str,
    job_title: &str,
    company_name: &str,
    status: &str,
) -> Email {
    let (title, note) = match status {
        "pending" => (
            "Application received",
            "Your application has been received and is waiting for review.",
        ),
        "reviewed" => (
            "Application reviewed",
            "The recruiter has reviewed your application.",
        ),
        "shortlisted" => (
            "You have been shortlisted",
            "Great news! You have been shortlisted for this position.",
        ),
        "rejected" => (
            "Application update",
            "After careful consideration the recruiter has decided to move forward with other candidates.",
        ),
        "accepted" => (
            "Your application was accepted",
            "Congratulations! Your application has been accepted. The recruiter will contact you with next steps.",
        ),
        _ => ("Application update", "The status of your application has changed."),
    };
    let body = format!(
        "<p>Hi {name},</p>\
         <p>{note}</p>\
         <p><strong>{job_title}</strong> at <strong>{company_name}</strong></p>"
    );
    Email {
        to: to.to_string(),
        subject: format!("{title}: {job_title}"),
        html: layout(title, &body),
    }
}
