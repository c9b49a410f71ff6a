use std::{process, sync::Arc};

use smart_erp::{
    api_types::{PlanningBatch, PlanningEntry},
    application::{
        backend::PlanningBackend,
        batch::{load_plan_file, stage_plan},
        error::AppError,
        planning::PlanningService,
    },
    config,
    domain::{
        planning::Shift,
        records::{PrintCriteria, format_sheet},
    },
    gateway::{CacheGateway, CacheStorage, GatewayConfig, MemoryCacheStorage},
    infra::{
        backend::HttpPlanningBackend,
        error::InfraError,
        http::{self, GatewayState},
        telemetry,
        upstream::UpstreamFetcher,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Plan(args) => run_plan(settings, args).await,
        config::Command::Report(args) => run_report(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let gateway_settings = &settings.gateway;
    let storage = match gateway_settings.cache_entry_limit {
        Some(limit) => MemoryCacheStorage::new().with_entry_limit(limit),
        None => MemoryCacheStorage::new(),
    };
    let fetcher = UpstreamFetcher::new(gateway_settings.upstream_timeout).map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to build upstream client: {err}"
        )))
    })?;

    let gateway = Arc::new(CacheGateway::new(
        gateway_settings.upstream.clone(),
        GatewayConfig::from(gateway_settings),
        Arc::new(storage) as Arc<dyn CacheStorage>,
        Arc::new(fetcher),
    ));

    gateway.install().await?;
    gateway.activate().await?;

    let router = http::build_router(
        GatewayState::new(Arc::clone(&gateway)).with_body_limit(gateway_settings.max_body_bytes),
    );
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "smart_erp::serve",
        addr = %settings.server.addr,
        upstream = %gateway_settings.upstream,
        "gateway listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    if tokio::time::timeout(settings.server.graceful_shutdown, gateway.settle())
        .await
        .is_err()
    {
        warn!(
            target = "smart_erp::serve",
            in_flight = gateway.refreshes_in_flight(),
            "background refreshes still running at shutdown"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "smart_erp::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "smart_erp::serve", "shutdown requested");
}

fn planning_service(settings: &config::Settings) -> Result<PlanningService, AppError> {
    let backend = HttpPlanningBackend::new(&settings.backend.base_url, settings.backend.timeout)?;
    Ok(PlanningService::new(
        Arc::new(backend) as Arc<dyn PlanningBackend>
    ))
}

async fn run_plan(settings: config::Settings, args: config::PlanArgs) -> Result<(), AppError> {
    let plan = load_plan_file(&args.file).await?;
    let service = planning_service(&settings)?;

    let staged = stage_plan(&service, &plan).await?;
    info!(
        target = "smart_erp::plan",
        entries = staged.len(),
        dry_run = args.dry_run,
        "plan staged"
    );

    if args.dry_run {
        let batch = PlanningBatch {
            entries: staged.iter().map(PlanningEntry::from).collect(),
        };
        let rendered = serde_json::to_string_pretty(&batch)
            .map_err(|err| AppError::unexpected(format!("failed to render batch: {err}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let report = service.submit_all().await?;
    println!("submitted {} planning entries", report.submitted);
    if !report.refreshed {
        warn!(
            target = "smart_erp::plan",
            "entries were saved but the record list could not be reloaded"
        );
    }
    Ok(())
}

async fn run_report(settings: config::Settings, args: config::ReportArgs) -> Result<(), AppError> {
    let service = planning_service(&settings)?;
    service.refresh_records().await?;

    let shift = Shift::try_from(args.shift)
        .map_err(|err| AppError::validation(err.to_string()))?;
    let criteria = PrintCriteria {
        date: args.date,
        shift,
        mould_box_size: args.box_size,
    };

    let records = service.print_subset(&criteria)?;
    println!("{}", format_sheet(&criteria, &records));
    Ok(())
}
