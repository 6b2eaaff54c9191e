//! The login transaction.
//!
//! Flow overview:
//! 1. Validate options and refuse to overwrite an existing login
//! 2. Direct mode: bind the supplied pair, persist, provision
//! 3. Interactive mode: create a session, bind it, open the browser, poll
//! 4. On authorization, persist the pair and provision the SSH identity
//!
//! Credentials are bound onto the session service before polling so the
//! handle is usable mid-flow. A later persistence failure leaves that
//! binding in place for the current process.

use lab_api_client::Credentials;
use lab_api_client::SessionService;
use lab_async_utils::CancelErr;
use lab_async_utils::OrCancelExt;
use tokio_util::sync::CancellationToken;

use crate::browser::Browser;
use crate::browser::SystemBrowser;
use crate::error::LoginError;
use crate::options::LoginMode;
use crate::options::LoginOptions;
use crate::poll::PollOutcome;
use crate::poll::PollSettings;
use crate::poll::wait_for_authorization;
use crate::store::CredentialStore;
use crate::store::IdentityProvisioner;

/// Progress notifications for the user-facing side channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginEvent {
    OpeningBrowser { url: String },
    /// The browser could not be launched; the user has to copy the URL.
    BrowserUnavailable { url: String },
    /// Polling is about to start.
    AwaitingAuthorization,
    /// A poll came back without authorization.
    Waiting { attempt: u32 },
    /// The session was authorized; credentials are about to be saved.
    Authorized,
}

/// How a login attempt ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Direct mode bound and saved the supplied credentials.
    Authenticated,
    /// Interactive mode saw the session authorized and saved it.
    Authorized,
    /// Nobody authorized the session before the deadline. Nothing was saved.
    TimedOut,
    /// The caller cancelled the flow. Nothing was saved.
    Cancelled,
}

type EventSink<'a> = Box<dyn FnMut(LoginEvent) + Send + 'a>;

/// Orchestrates one login transaction over injected collaborators.
pub struct Login<'a> {
    service: &'a dyn SessionService,
    store: &'a mut dyn CredentialStore,
    provisioner: &'a dyn IdentityProvisioner,
    browser: &'a dyn Browser,
    settings: PollSettings,
    on_event: EventSink<'a>,
}

impl<'a> Login<'a> {
    pub fn new(
        service: &'a dyn SessionService,
        store: &'a mut dyn CredentialStore,
        provisioner: &'a dyn IdentityProvisioner,
    ) -> Self {
        Self {
            service,
            store,
            provisioner,
            browser: &SystemBrowser,
            settings: PollSettings::default(),
            on_event: Box::new(|_| {}),
        }
    }

    pub fn with_browser(mut self, browser: &'a dyn Browser) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn on_event(mut self, sink: impl FnMut(LoginEvent) + Send + 'a) -> Self {
        self.on_event = Box::new(sink);
        self
    }

    pub async fn run(
        &mut self,
        options: &LoginOptions,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, LoginError> {
        let mode = options.mode()?;

        if self.store.stored_credentials().is_some() {
            return Err(LoginError::AlreadyAuthenticated);
        }

        match mode {
            LoginMode::Direct(credentials) => {
                tracing::info!(
                    session_id = %credentials.session_id,
                    "logging in with supplied credentials"
                );
                self.service.bind_credentials(credentials.clone());
                self.save_session_and_generate_identity(&credentials)?;
                Ok(LoginOutcome::Authenticated)
            }
            LoginMode::Interactive => self.run_interactive(cancel).await,
        }
    }

    async fn run_interactive(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, LoginError> {
        if cancel.is_cancelled() {
            return Ok(LoginOutcome::Cancelled);
        }

        let session = match self.service.create_session().or_cancel(cancel).await {
            Ok(result) => result.map_err(LoginError::SessionCreation)?,
            Err(CancelErr::Cancelled | CancelErr::DeadlineElapsed) => {
                return Ok(LoginOutcome::Cancelled);
            }
        };
        tracing::info!(session_id = %session.id, "login session created");

        let access_token = session.access_token.clone();
        self.service
            .bind_credentials(Credentials::new(&session.id, &access_token));

        self.emit(LoginEvent::OpeningBrowser {
            url: session.auth_url.clone(),
        });
        if let Err(err) = self.browser.open(&session.auth_url) {
            tracing::debug!("couldn't open browser: {err}");
            self.emit(LoginEvent::BrowserUnavailable {
                url: session.auth_url.clone(),
            });
        }

        self.emit(LoginEvent::AwaitingAuthorization);
        let on_event = &mut self.on_event;
        let outcome = wait_for_authorization(
            self.service,
            &session.id,
            self.settings,
            cancel,
            |attempt| on_event(LoginEvent::Waiting { attempt }),
        )
        .await;

        match outcome {
            PollOutcome::Authorized(authorized) => {
                self.emit(LoginEvent::Authorized);
                let session_id = if authorized.id.is_empty() {
                    session.id
                } else {
                    authorized.id
                };
                self.save_session_and_generate_identity(&Credentials::new(
                    session_id,
                    access_token,
                ))?;
                Ok(LoginOutcome::Authorized)
            }
            PollOutcome::TimedOut => {
                tracing::warn!(
                    timeout = ?self.settings.timeout,
                    "session was not authorized in time"
                );
                Ok(LoginOutcome::TimedOut)
            }
            PollOutcome::Cancelled => {
                tracing::info!("login cancelled while waiting for authorization");
                Ok(LoginOutcome::Cancelled)
            }
        }
    }

    /// Store the pair, persist it, then make sure the SSH identity exists.
    fn save_session_and_generate_identity(
        &mut self,
        credentials: &Credentials,
    ) -> Result<(), LoginError> {
        self.store.set_credentials(credentials);
        self.store.dump().map_err(LoginError::Persistence)?;

        let dir = self.store.ssh_dir();
        self.provisioner
            .generate_identity(&dir)
            .map_err(|source| LoginError::IdentityProvisioning { dir, source })?;

        tracing::info!(session_id = %credentials.session_id, "credentials saved");
        Ok(())
    }

    fn emit(&mut self, event: LoginEvent) {
        (self.on_event)(event);
    }
}
