//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the OSF web API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::cas::CasClient;
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers;
use crate::mail::Mailer;
use crate::providers::Registry;
use crate::sanctions::{SanctionService, TokenSigner};
use crate::telemetry::request_id_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub crypto_key: CryptoKey,
    pub token_signer: Arc<TokenSigner>,
    pub providers: Arc<Registry>,
    pub cas: Arc<CasClient>,
    pub mailer: Arc<dyn Mailer>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build the state from validated configuration.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let key_bytes = config
            .crypto_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("crypto key is missing"))?;
        let crypto_key = CryptoKey::new(key_bytes)?;
        let jwt_secret = config
            .jwt_secret
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("JWT secret is missing"))?;
        let token_signer = TokenSigner::new(
            jwt_secret.as_bytes(),
            chrono::Duration::hours(config.sanction_token_ttl_hours),
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("osf-web/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let providers = Registry::from_config(&config);
        let cas = CasClient::new(http.clone(), &config.cas_server_url);

        Ok(Self {
            config: Arc::new(config),
            db,
            crypto_key,
            token_signer: Arc::new(token_signer),
            providers: Arc::new(providers),
            cas: Arc::new(cas),
            mailer,
            http,
        })
    }

    pub fn db_arc(&self) -> Arc<DatabaseConnection> {
        Arc::new(self.db.clone())
    }

    pub fn sanction_service(&self) -> SanctionService {
        SanctionService::new(
            self.db_arc(),
            Arc::clone(&self.token_signer),
            Arc::clone(&self.mailer),
            Arc::clone(&self.config),
        )
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(handlers::root))
        .route(
            "/v2/comments/{comment_id}",
            get(handlers::comments::get_comment)
                .put(handlers::comments::update_comment)
                .patch(handlers::comments::update_comment),
        )
        .route(
            "/v2/comments/{comment_id}/reports",
            get(handlers::comments::list_reports).post(handlers::comments::create_report),
        )
        .route(
            "/v2/comments/{comment_id}/reports/{user_id}",
            get(handlers::comments::get_report)
                .put(handlers::comments::update_report)
                .patch(handlers::comments::update_report)
                .delete(handlers::comments::delete_report),
        )
        .route(
            "/v2/nodes/{node_id}/comments",
            get(handlers::comments::list_node_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/v2/nodes/{node_id}/registrations",
            post(handlers::sanctions::create_registration),
        )
        .route(
            "/v2/registrations/{registration_id}/retraction",
            post(handlers::sanctions::request_retraction),
        )
        .route(
            "/v2/applications",
            get(handlers::applications::list_applications)
                .post(handlers::applications::create_application),
        )
        .route(
            "/v2/applications/{client_id}",
            get(handlers::applications::get_application)
                .patch(handlers::applications::update_application)
                .delete(handlers::applications::deactivate_application),
        )
        .route(
            "/v2/applications/{client_id}/reset_secret",
            post(handlers::applications::reset_secret),
        )
        .route(
            "/v2/users/me/external_accounts",
            get(handlers::oauth::list_external_accounts),
        )
        .route(
            "/v2/users/me/external_accounts/{account_id}",
            axum::routing::delete(handlers::oauth::unlink_external_account),
        )
        .route(
            "/v2/users/me/status_messages",
            get(handlers::status::pop_status_messages),
        )
        .route("/oauth/connect/{service_name}", get(handlers::oauth::connect))
        .route(
            "/oauth/callback/{service_name}",
            get(handlers::oauth::callback),
        )
        .route(
            "/oauth/callback/{service_name}/",
            get(handlers::oauth::callback),
        )
        .route("/token_action/{token}", get(handlers::tokens::token_action))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();
    let state = AppState::new(config, db, mailer)?;
    tracing::info!(
        providers = ?state.providers.short_names(),
        "External providers registered"
    );
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
    }
    tracing::info!("Shutdown signal received");
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::comments::get_comment,
        crate::handlers::comments::update_comment,
        crate::handlers::comments::list_node_comments,
        crate::handlers::comments::create_comment,
        crate::handlers::comments::list_reports,
        crate::handlers::comments::create_report,
        crate::handlers::comments::get_report,
        crate::handlers::comments::update_report,
        crate::handlers::comments::delete_report,
        crate::handlers::oauth::connect,
        crate::handlers::oauth::callback,
        crate::handlers::oauth::list_external_accounts,
        crate::handlers::oauth::unlink_external_account,
        crate::handlers::applications::list_applications,
        crate::handlers::applications::create_application,
        crate::handlers::applications::get_application,
        crate::handlers::applications::update_application,
        crate::handlers::applications::deactivate_application,
        crate::handlers::applications::reset_secret,
        crate::handlers::sanctions::create_registration,
        crate::handlers::sanctions::request_retraction,
        crate::handlers::status::pop_status_messages,
        crate::handlers::tokens::token_action,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::comments::CommentResponse,
            crate::handlers::comments::CommentUpdateRequest,
            crate::handlers::comments::CommentCreateRequest,
            crate::handlers::comments::CommentReportResponse,
            crate::handlers::comments::CommentReportRequest,
            crate::handlers::oauth::ExternalAccountResponse,
            crate::handlers::applications::ApplicationResponse,
            crate::handlers::applications::ApplicationLinks,
            crate::handlers::applications::CreateApplicationRequest,
            crate::handlers::applications::UpdateApplicationRequest,
            crate::handlers::sanctions::CreateRegistrationRequest,
            crate::handlers::sanctions::RetractionRequest,
            crate::handlers::sanctions::RegistrationResponse,
            crate::handlers::sanctions::SanctionResponse,
            crate::models::status_message::StatusMessageResponse,
            crate::models::comment::ReportCategory,
            crate::models::sanction::SanctionKind,
            crate::models::sanction::SanctionState,
            crate::models::sanction::ApprovalMode,
        )
    ),
    modifiers(&BearerAuth),
    info(
        title = "OSF Web API",
        description = "Comments, external account linking, developer applications and sanction approvals",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
