use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenMaker;
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{authorize, AuthenticationGate, GateChain, OwnershipGate};
use crate::services::{AssetCreator, BlobStore, MediaManager};

/// Shared collaborators handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<dyn TokenMaker>,
    pub media: MediaManager,
    pub assets: AssetCreator,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<dyn TokenMaker>, blobs: Arc<dyn BlobStore>, config: AppConfig) -> Self {
        let media = MediaManager::new(blobs);
        Self {
            assets: AssetCreator::new(store.clone(), media.clone()),
            store,
            tokens,
            media,
            config: Arc::new(config),
        }
    }

    fn authentication(&self) -> AuthenticationGate {
        AuthenticationGate::new(self.tokens.clone(), self.store.clone())
    }
}

/// The full HTTP surface.
///
/// Routes fall into three tiers: public, authenticated, and
/// authenticated plus ownership or admin. Paths that mix tiers merge a
/// public method router with a gated one.
pub fn router(state: AppState) -> Router {
    let authenticated = Arc::new(GateChain::authenticated(state.authentication()));
    let owner = Arc::new(
        GateChain::authenticated(state.authentication()).require_owner(OwnershipGate::new(state.store.clone())),
    );
    let admin = Arc::new(GateChain::authenticated(state.authentication()).require_admin());

    let routes = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/register", post(public::register))
        .route("/auth/login", post(public::login))
        .route("/auth/logout", post(public::logout))
        .route("/users/:username/assets", get(public::list_user_assets))
        // Authenticated
        .route(
            "/me",
            get(protected::me).route_layer(from_fn_with_state(authenticated.clone(), authorize)),
        )
        .route(
            "/me/assets",
            get(protected::my_assets).route_layer(from_fn_with_state(authenticated.clone(), authorize)),
        )
        .route(
            "/me/password",
            put(protected::change_password).route_layer(from_fn_with_state(authenticated.clone(), authorize)),
        )
        .route(
            "/me/profile-image",
            put(protected::set_profile_image)
                .delete(protected::clear_profile_image)
                .route_layer(from_fn_with_state(authenticated.clone(), authorize)),
        )
        .route(
            "/assets",
            get(public::list_assets).merge(
                post(protected::create_asset).route_layer(from_fn_with_state(authenticated.clone(), authorize)),
            ),
        )
        // Owner-only
        .route(
            "/assets/:asset_id",
            get(public::get_asset).merge(
                put(protected::update_asset)
                    .delete(protected::delete_asset)
                    .route_layer(from_fn_with_state(owner.clone(), authorize)),
            ),
        )
        .route(
            "/assets/:asset_id/contacts",
            get(public::list_contacts).merge(
                post(protected::add_contact).route_layer(from_fn_with_state(owner.clone(), authorize)),
            ),
        )
        .route(
            "/assets/:asset_id/contacts/:contact_id",
            put(protected::update_contact)
                .delete(protected::delete_contact)
                .route_layer(from_fn_with_state(owner.clone(), authorize)),
        )
        .route(
            "/assets/:asset_id/images",
            get(public::list_images).merge(
                post(protected::add_images).route_layer(from_fn_with_state(owner.clone(), authorize)),
            ),
        )
        .route(
            "/assets/:asset_id/images/:image_id",
            delete(protected::delete_image).route_layer(from_fn_with_state(owner, authorize)),
        )
        // Admin
        .route(
            "/admin/users",
            get(elevated::list_users).route_layer(from_fn_with_state(admin, authorize)),
        );

    let uploads = ServeDir::new(state.config.storage.upload_root.join("uploads"));
    let body_limit = state.config.api.max_request_size_bytes;
    let timeout = state.config.server.request_timeout();
    let cors = cors_layer(&state.config.security.cors_origins);

    routes.nest_service("/uploads", uploads).with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(TimeoutLayer::new(timeout))
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring unparseable CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
