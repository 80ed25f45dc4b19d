// app.rs - Shared application state and router assembly
//
// Route groups mirror the handler tiers: public routes carry no
// authentication, protected routes run behind the session token middleware.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::crypto::{CryptoError, CryptoVault, WorkflowCrypto};
use crate::database::{Backend, DatabaseError, Repository};
use crate::handlers::{protected, public};
use crate::middleware::session_auth_middleware;
use crate::models::collections;
use crate::services::{
    ApprovalService, ChatService, CompanyService, DocumentStore, Notifier, SubmissionService, TokenService,
    TracingNotifier, UploadPolicy, UserService, WorkflowService,
};

/// Everything a handler can reach. Cloned per request; all members are
/// cheap handles over shared storage.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Backend,
    pub vault: CryptoVault,
    pub tokens: TokenService,
    pub users: UserService,
    pub companies: CompanyService,
    pub documents: DocumentStore,
    pub submissions: SubmissionService,
    pub approval: ApprovalService,
    pub chat: ChatService,
    pub workflows: WorkflowService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backend: Backend,
        vault: CryptoVault,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, DatabaseError> {
        let timezone = config.security.timezone();
        let responses = Repository::new(backend.collection(collections::RESPONSES)?);

        let tokens = TokenService::new(
            Repository::new(backend.collection(collections::SESSION_TOKENS)?),
            config.security.token_ttl_minutes,
            timezone,
        );
        let users = UserService::new(Repository::new(backend.collection(collections::USERS)?), vault.clone());
        let companies = CompanyService::new(
            Repository::new(backend.collection(collections::COMPANIES)?),
            UploadPolicy::logo(&config.uploads),
        );
        let documents = DocumentStore::new(
            Repository::new(backend.collection(collections::GENERATED_DOCUMENTS)?),
            responses.clone(),
        );
        let submissions = SubmissionService::new(
            Repository::new(backend.collection(collections::FORMS)?),
            responses.clone(),
            documents.clone(),
            companies.clone(),
            notifier.clone(),
            timezone,
        );
        let approval = ApprovalService::new(
            responses.clone(),
            Repository::new(backend.collection(collections::APPROVED_DOCUMENTS)?),
            Repository::new(backend.collection(collections::CLIENT_SIGNATURES)?),
            UploadPolicy::pdf(&config.uploads),
            notifier.clone(),
        );
        let chat = ChatService::new(responses, notifier);
        let workflows = WorkflowService::new(
            Repository::new(backend.collection(collections::WORKFLOWS)?),
            WorkflowCrypto::new(vault.clone()),
        );

        Ok(Self {
            config: Arc::new(config),
            backend,
            vault,
            tokens,
            users,
            companies,
            documents,
            submissions,
            approval,
            chat,
            workflows,
        })
    }
}

/// Build the state from configuration: encryption key, storage backend and
/// the default logging notifier. A missing or malformed key is fatal.
pub async fn bootstrap(config: AppConfig) -> anyhow::Result<AppState> {
    let key = config
        .security
        .encryption_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(CryptoError::MissingKey)?;
    let vault = CryptoVault::from_hex(key)?;
    info!("Encryption key loaded (fingerprint {})", vault.key_fingerprint());

    let backend = Backend::from_config(&config.database).await?;
    if config.is_production() && matches!(backend, Backend::Memory(_)) {
        anyhow::bail!("DATABASE_URL is required in production");
    }

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    Ok(AppState::new(config, backend, vault, notifier)?)
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    let protected = Router::new()
        .merge(auth_routes())
        .merge(form_routes())
        .merge(response_routes())
        .merge(document_routes())
        .merge(approval_routes())
        .merge(chat_routes())
        .merge(workflow_routes())
        .merge(company_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), session_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/login", post(public::auth::login))
        // Protected API
        .merge(protected)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/validate", post(auth::validate))
        .route("/api/auth/session", delete(auth::logout))
}

fn form_routes() -> Router<AppState> {
    use protected::forms;

    Router::new().route("/api/forms", get(forms::list).post(forms::create))
}

fn response_routes() -> Router<AppState> {
    use protected::responses;

    Router::new()
        .route("/api/responses", get(responses::list).post(responses::submit))
        .route("/api/responses/:id", get(responses::show))
        .route("/api/responses/:id/document", get(responses::document))
}

fn document_routes() -> Router<AppState> {
    use protected::documents;

    Router::new()
        .route("/api/documents/:generated_id", get(documents::show))
        .route("/api/documents/:generated_id/download", get(documents::download))
}

fn approval_routes() -> Router<AppState> {
    use protected::approval;

    Router::new()
        // Correction file and state transitions
        .route(
            "/api/responses/:id/correction",
            post(approval::attach_correction).delete(approval::remove_correction),
        )
        .route("/api/responses/:id/approve", post(approval::approve))
        .route("/api/responses/:id/approved", get(approval::approved_download))
        .route("/api/responses/:id/publish", post(approval::publish))
        // Client signature
        .route(
            "/api/responses/:id/signature",
            get(approval::signature_download).post(approval::sign),
        )
}

fn chat_routes() -> Router<AppState> {
    use protected::chat;

    Router::new()
        .route("/api/responses/:id/messages", get(chat::list).post(chat::post))
        .route("/api/messages/read-all", put(chat::read_all))
}

fn workflow_routes() -> Router<AppState> {
    use protected::workflows;

    Router::new()
        .route("/api/workflows", get(workflows::list).post(workflows::create))
        .route("/api/workflows/migrate", post(workflows::migrate))
        .route(
            "/api/workflows/:id",
            get(workflows::show).put(workflows::update).delete(workflows::delete),
        )
        .route("/api/workflows/:id/nodes/:node_id", patch(workflows::update_node))
}

fn company_routes() -> Router<AppState> {
    use protected::companies;

    Router::new()
        .route("/api/companies", get(companies::list).post(companies::create))
        .route("/api/companies/:id/logo", post(companies::upload_logo))
}
