//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use secrely_common::auth::{
    ConsentFlow, KeychainProvider, KeychainTokenStore, TokenLifecycleManager, TokenStore,
};
use secrely_core::{
    BookingService, CalendarGateway, CallInitiator, ExtractionService, MediaAccess,
    PhoneCallService, ResultChannelOpener, SessionCoordinator, VoiceAgent,
};
use secrely_domain::constants::TOKEN_EXPIRY_SKEW_SECS;
use secrely_domain::{resolve_timezone, Config, Result, SecrelyError};
use secrely_infra::config;
use secrely_infra::integrations::calendar::AuthorizationPrompt;
use secrely_infra::{
    BackendClient, BrowserConsentFlow, ElevenLabsAgent, GoogleCalendarGateway,
    GoogleOAuthSettings, HttpClient, WebSocketResultChannelOpener,
};
use tracing::{debug, info, warn};

/// Reads `path` when given, otherwise the environment, a discovered config
/// file, or the defaults, in that order.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_from_file(Some(path.to_path_buf())),
        None => config::load(),
    }
}

/// Token manager over `store` that treats tokens close to expiry as expired.
pub fn token_manager(store: Arc<dyn TokenStore>) -> TokenLifecycleManager {
    TokenLifecycleManager::new(store).with_expiry_skew(TOKEN_EXPIRY_SKEW_SECS)
}

/// Adapters the context wires together. Tests swap in fakes here.
pub struct AppPorts {
    pub tokens: Arc<TokenLifecycleManager>,
    pub consent: Option<Arc<dyn ConsentFlow>>,
    pub agent: Arc<dyn VoiceAgent>,
    pub extraction: Arc<dyn ExtractionService>,
    pub calendar: Arc<dyn CalendarGateway>,
    pub initiator: Arc<dyn CallInitiator>,
    pub channels: Arc<dyn ResultChannelOpener>,
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub tokens: Arc<TokenLifecycleManager>,
    pub booking: Arc<BookingService>,
    pub phone: Arc<PhoneCallService>,
    consent: Option<Arc<dyn ConsentFlow>>,
    agent: Arc<dyn VoiceAgent>,
    extraction: Arc<dyn ExtractionService>,
    timezone: Tz,
}

impl AppContext {
    /// Builds the production adapters from `config` and restores any
    /// previous calendar sign-in from the keychain.
    pub async fn new(config: Config, prompt: AuthorizationPrompt) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.backend.timeout_secs))
            .build()?;
        let backend = Arc::new(BackendClient::from_config(&config.backend)?);

        let store: Arc<dyn TokenStore> = Arc::new(KeychainTokenStore::new(KeychainProvider::new(
            config.google.keychain_service.clone(),
        )));
        let mut tokens = token_manager(store);
        let consent: Option<Arc<dyn ConsentFlow>> = match GoogleOAuthSettings::from_config(&config.google)
        {
            Ok(settings) => {
                tokens = tokens.with_oauth_client(Arc::new(settings.refresh_client()));
                let flow: Arc<dyn ConsentFlow> = Arc::new(BrowserConsentFlow::new(settings, prompt));
                tokens = tokens.with_consent_flow(Arc::clone(&flow));
                Some(flow)
            }
            Err(err) => {
                warn!(error = %err, "Google sign-in unavailable");
                None
            }
        };
        let tokens = Arc::new(tokens);
        match tokens.initialize().await {
            Ok(true) => debug!("Restored calendar sign-in"),
            Ok(false) => debug!("No calendar sign-in stored"),
            Err(err) => warn!(error = %err, "Could not read stored credentials"),
        }

        let ports = AppPorts {
            tokens,
            consent,
            agent: Arc::new(ElevenLabsAgent::from_config(&config.agent, Arc::clone(&backend))),
            extraction: backend.clone(),
            calendar: Arc::new(GoogleCalendarGateway::from_config(&config.calendar, http)),
            initiator: backend,
            channels: Arc::new(WebSocketResultChannelOpener::from_config(&config)),
        };
        info!(backend = %config.backend.base_url, "Application context ready");
        Ok(Self::from_parts(config, ports))
    }

    pub fn from_parts(config: Config, ports: AppPorts) -> Self {
        let timezone = resolve_timezone(config.calendar.timezone.as_deref());
        let booking = BookingService::new(ports.calendar, ports.tokens.clone())
            .with_calendar_id(config.calendar.calendar_id.clone());
        let host_email = config.host.email.clone().or_else(|| ports.tokens.identity());
        let phone = PhoneCallService::new(ports.initiator, ports.channels)
            .with_host(config.host.name.clone(), host_email);

        Self {
            tokens: ports.tokens,
            booking: Arc::new(booking),
            phone: Arc::new(phone),
            consent: ports.consent,
            agent: ports.agent,
            extraction: ports.extraction,
            timezone,
            config,
        }
    }

    /// A coordinator for one `talk` run.
    pub fn coordinator(&self, media: Arc<dyn MediaAccess>) -> SessionCoordinator {
        SessionCoordinator::new(media, Arc::clone(&self.agent), Arc::clone(&self.extraction))
            .with_host_name(self.config.host.name.clone())
            .with_timezone(self.timezone)
    }

    pub fn consent(&self) -> Result<Arc<dyn ConsentFlow>> {
        self.consent.clone().ok_or_else(|| {
            SecrelyError::Config("google.client_id is not configured; sign-in is unavailable".into())
        })
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("backend", &self.config.backend.base_url)
            .field("timezone", &self.timezone)
            .field("signed_in", &self.tokens.is_authenticated())
            .finish_non_exhaustive()
    }
}
