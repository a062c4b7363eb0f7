use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

mod templates;

use templates::MailContent;

/// Outbound mail boundary. `AppState` holds this as a trait object so tests
/// can swap in a no-op implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        // Port 465 is implicit TLS, everything else goes through STARTTLS.
        let mut builder = if cfg.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?.port(cfg.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?.port(cfg.port)
        };
        if let (Some(user), Some(pass)) = (cfg.username.clone(), cfg.password.clone()) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        let from: Mailbox = cfg.from.parse()?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send(&self, to: &str, content: MailContent) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(&content.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(content.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(content.html),
                    ),
            )?;
        self.transport.send(message).await?;
        info!(to = %to, subject = %content.subject, "mail sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()> {
        self.send(to, templates::verification(code)).await
    }

    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()> {
        self.send(to, templates::welcome(first_name)).await
    }

    async fn send_password_reset(&self, to: &str, code: &str) -> anyhow::Result<()> {
        self.send(to, templates::password_reset(code)).await
    }
}

/// Swallows everything; used by `AppState::fake`.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_verification(&self, _to: &str, _code: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_welcome(&self, _to: &str, _first_name: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn send_password_reset(&self, _to: &str, _code: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
