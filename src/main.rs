use std::net::SocketAddr;
use std::sync::Arc;

use careerchat::cli::{
    Args, build_config, init_logging, load_jwt_secret, open_database, validate_allow_origin,
};
use careerchat::store::TokenStore;
use careerchat::{create_app, init_cleanup};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let Some(allow_origin) = validate_allow_origin(&args.allow_origin) else {
        std::process::exit(1);
    };

    let store = Arc::new(TokenStore::new());
    let config = build_config(db, store.clone(), jwt_secret, allow_origin);

    init_cleanup(store);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
