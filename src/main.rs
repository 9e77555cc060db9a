use std::{error::Error as StdError, process, sync::Arc};

use quillpost::{
    application::{
        error::AppError,
        posts::PostService,
        repos::{PostsRepo, PostsWriteRepo},
        uploads::UploadService,
    },
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        images::ImageProcessor,
        telemetry,
        uploads::UploadStorage,
    },
    presentation::sanitize::ContentRenderer,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let mut chain = Vec::new();
    let mut current = StdError::source(error);
    while let Some(inner) = current {
        chain.push(inner.to_string());
        current = inner.source();
    }

    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "quillpost::serve",
        addr = %settings.server.addr,
        uploads = %settings.uploads.directory.display(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::from(err)))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "quillpost::migrate",
        database = %settings.database.url,
        "migrations applied"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::from(err)))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn build_http_state(
    repositories: Arc<SqliteRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();

    let storage = UploadStorage::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let processor = settings
        .images
        .resize
        .then(|| ImageProcessor::new(settings.images.max_width.get()));

    Ok(HttpState {
        posts: Arc::new(PostService::new(posts_repo, posts_write_repo)),
        uploads: Arc::new(UploadService::new(Arc::new(storage), processor)),
        content: Arc::new(ContentRenderer::new(settings.content.sanitize)),
        db: repositories,
        upload_limit_bytes: settings.uploads.max_request_bytes.get(),
        max_image_width: processor.map(|processor| processor.max_width()),
    })
}
