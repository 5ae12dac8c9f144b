use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use printshop_api::lock::RedisOrderLock;
use printshop_api::state::{AppState, CheckoutUrls, RetryPolicy};
use printshop_api::{app, worker};
use printshop_catalog::VariantValidator;
use printshop_order::{ArtifactResolver, FulfillmentGateway, OrderReconciler, PaymentGateway};
use printshop_store::{
    BrevoMailer, Config, DbClient, PgOrderRepository, PrintfulClient, PublicStorage, RedisClient, StripeClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "printshop_api=debug,printshop_order=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting print shop API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
    db.migrate().await?;
    let orders = Arc::new(PgOrderRepository::new(db.pool.clone()));

    // Redis
    let redis = Arc::new(RedisClient::new(&config.redis.url).await?);
    let locks = Arc::new(RedisOrderLock::new(redis, config.reconciliation.lock_ttl_seconds));

    // Providers
    let printful = Arc::new(PrintfulClient::new(
        config.printful.api_url.clone(),
        config.printful.api_key.clone(),
        Duration::from_secs(config.printful.timeout_seconds),
    )?);
    let stripe = Arc::new(StripeClient::new(
        config.stripe.api_url.clone(),
        config.stripe.secret_key.clone(),
        Duration::from_secs(config.stripe.timeout_seconds),
    )?);
    let mailer = Arc::new(BrevoMailer::new(
        config.mail.api_url.clone(),
        config.mail.api_key.clone(),
        config.mail.sender_email.clone(),
        config.mail.sender_name.clone(),
        Duration::from_secs(config.mail.timeout_seconds),
    )?);
    let storage = Arc::new(PublicStorage::new(&config.storage.public_base_url)?);

    // Reconciliation core
    let gateway_timeout = config.reconciliation.gateway_timeout();
    let validator = VariantValidator::new(printful.clone(), gateway_timeout);
    let fulfillment = Arc::new(FulfillmentGateway::new(printful, validator, gateway_timeout));
    let payments = Arc::new(PaymentGateway::new(stripe, gateway_timeout));
    let reconciler = Arc::new(OrderReconciler::new(
        orders.clone(),
        fulfillment.clone(),
        payments.clone(),
        mailer,
        ArtifactResolver::new(storage),
    ));

    let app_state = AppState {
        orders,
        reconciler,
        fulfillment,
        payments,
        locks,
        checkout: CheckoutUrls {
            success_url: config.stripe.success_url.clone(),
            cancel_url: config.stripe.cancel_url.clone(),
        },
        retry: RetryPolicy {
            interval: config.reconciliation.retry_interval(),
            max_attempts: config.reconciliation.max_attempts,
            batch_size: config.reconciliation.batch_size,
        },
        lock_deadline: config.reconciliation.lock_deadline(),
    };

    tokio::spawn(worker::start_retry_worker(app_state.clone()));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
