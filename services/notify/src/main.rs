use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use tidings_core::config::Config;
use tidings_core::task::Supervisor;
use tidings_core::tracing::init_tracing;
use tidings_notify::broadcaster::Broadcaster;
use tidings_notify::config::NotifyConfig;
use tidings_notify::infra::mail::SmtpMailer;
use tidings_notify::infra::profile::HttpProfileSource;
use tidings_notify::router::build_router;
use tidings_notify::state::AppState;
use tidings_notify::usecase::directory_sync::{DirectorySyncJob, SyncDirectoryUseCase, SyncMode};
use tidings_notify::usecase::lifecycle::{
    PublishDueScheduledUseCase, PublishUseCase, ScheduledPublishJob,
};
use tidings_notify::usecase::system_template::SeedSystemTemplatesUseCase;
use tidings_notify_migration::Migrator;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = NotifyConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");

    let mailer = SmtpMailer::new(&config.smtp()).expect("invalid SMTP configuration");
    let profiles = config.profile_service_url.as_deref().map(|url| {
        HttpProfileSource::new(url, &config.service_token).expect("invalid PROFILE_SERVICE_URL")
    });

    let state = AppState {
        db,
        broadcaster: Broadcaster::new(config.broadcast_queue_capacity),
        mailer,
        profiles,
        service_token: config.service_token.clone(),
        side_effect_timeout: config.side_effect_timeout(),
    };

    SeedSystemTemplatesUseCase {
        repo: state.system_template_repo(),
    }
    .execute()
    .await
    .expect("failed to seed system templates");

    let mut supervisor = Supervisor::new();
    supervisor.spawn_periodic(
        ScheduledPublishJob {
            usecase: PublishDueScheduledUseCase {
                publish: PublishUseCase {
                    repo: state.notification_repo(),
                    directory: state.user_directory(),
                    broadcaster: state.broadcaster.clone(),
                },
            },
        },
        config.scheduler_interval(),
    );
    match &state.profiles {
        Some(source) => {
            for (mode, every) in [
                (SyncMode::Incremental, config.directory_sync_interval()),
                (SyncMode::Full, config.directory_full_sync_interval()),
            ] {
                supervisor.spawn_periodic(
                    DirectorySyncJob {
                        usecase: SyncDirectoryUseCase {
                            source: source.clone(),
                            directory: state.user_directory(),
                            state: state.sync_state_repo(),
                        },
                        mode,
                    },
                    every,
                );
            }
        }
        None => info!("PROFILE_SERVICE_URL not set, directory sync disabled"),
    }

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.notify_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(jobs = supervisor.job_count(), "notify service listening on {addr}");
    let token = supervisor.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
                _ = token.cancelled() => {}
            }
        })
        .await
        .expect("server error");

    supervisor.shutdown(config.shutdown_grace()).await;
}
