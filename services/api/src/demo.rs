use crate::infra::InMemoryPipelineBackend;
use clap::Args;
use hiring_pipeline::config::{validate_backend_url, AppConfig};
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::pipeline::{
    ApplicationId, BoardView, BulkAction, BulkReport, DragOutcome, FilterState,
    HttpPipelineBackend, JobFilter, JobId, NotificationLevel, PipelineBackend, PipelineError,
    PipelineService, PipelineSettings, PipelineStage,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct BoardArgs {
    /// Free-text filter over candidate name, email and job title
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Only show applications for this job id
    #[arg(long)]
    pub(crate) job: Option<String>,
    /// Override the configured recruiting backend base URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Application id whose writes the in-memory backend rejects (repeatable).
    /// Defaults to app-1003.
    #[arg(long = "fail", value_name = "APPLICATION_ID")]
    pub(crate) fail: Vec<String>,
}

pub(crate) async fn run_board(mut args: BoardArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(backend_url) = args.backend_url.take() {
        validate_backend_url(&backend_url)?;
        config.backend.base_url = backend_url;
    }
    telemetry::init(&config.telemetry)?;

    let backend = HttpPipelineBackend::new(&config.backend).map_err(PipelineError::from)?;
    let service = PipelineService::new(Arc::new(backend), config.pipeline);
    service.refresh().await?;

    let job = args.job.map(JobId::new).map_or(JobFilter::All, JobFilter::Job);
    service.set_filter(FilterState::new(args.search.unwrap_or_default(), job));

    println!("Pipeline board ({})", config.backend.base_url);
    render_board(&service.snapshot());
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let failing: Vec<ApplicationId> = if args.fail.is_empty() {
        vec![ApplicationId::new("app-1003")]
    } else {
        args.fail.into_iter().map(ApplicationId::new).collect()
    };

    let backend = Arc::new(InMemoryPipelineBackend::seeded(failing.clone()));
    let service = PipelineService::new(Arc::clone(&backend), PipelineSettings::default());

    println!("Hiring pipeline demo");
    let summary = service.refresh().await?;
    println!(
        "- loaded {} applications across {} jobs ({} with an unrecognized status)",
        summary.applications, summary.jobs, summary.anomalies
    );
    render_board(&service.snapshot());

    println!("\nDrag: first pending card to Reviewing");
    if let Some(card) = first_in(&service, PipelineStage::Pending, &failing) {
        describe_drag(&service, &card, PipelineStage::Reviewing).await;
    }

    println!("\nDrag: a card the backend rejects to Interview");
    match failing
        .iter()
        .find(|id| service.stage_of(id).is_some_and(|stage| !stage.is_terminal()))
    {
        Some(card) => describe_drag(&service, card, PipelineStage::Interview).await,
        None => println!("- no rejecting card is on the board; skipped"),
    }

    println!("\nBulk: every reviewing card to Shortlisted");
    let reviewing: Vec<ApplicationId> = service
        .snapshot()
        .column(PipelineStage::Reviewing)
        .applications
        .iter()
        .map(|application| application.id.clone())
        .collect();
    for id in &reviewing {
        service.toggle_selection(id)?;
    }
    let report = service
        .apply_action(BulkAction::MoveTo {
            stage: PipelineStage::Shortlisted,
            note: Some("Advanced in pipeline review".to_string()),
        })
        .await;
    render_report(&report);

    println!("\nBulk: notify every shortlisted candidate");
    service.set_filter(FilterState::default());
    let shortlisted: Vec<ApplicationId> = service
        .snapshot()
        .column(PipelineStage::Shortlisted)
        .applications
        .iter()
        .map(|application| application.id.clone())
        .collect();
    for id in &shortlisted {
        service.toggle_selection(id)?;
    }
    let report = service
        .apply_action(BulkAction::Notify {
            message: "Thanks for your patience, we will schedule interviews shortly.".to_string(),
        })
        .await;
    render_report(&report);
    println!("- {} candidate messages delivered", backend.notified().len());

    println!("\nFinal board");
    render_board(&service.snapshot());
    Ok(())
}

fn first_in<B>(
    service: &PipelineService<B>,
    stage: PipelineStage,
    skip: &[ApplicationId],
) -> Option<ApplicationId>
where
    B: PipelineBackend + 'static,
{
    service
        .snapshot()
        .column(stage)
        .applications
        .iter()
        .map(|application| application.id.clone())
        .find(|id| !skip.contains(id))
}

async fn describe_drag<B>(service: &PipelineService<B>, id: &ApplicationId, target: PipelineStage)
where
    B: PipelineBackend + 'static,
{
    let name = service
        .application(id)
        .map(|application| application.candidate.name)
        .unwrap_or_else(|| id.as_str().to_string());

    match service.move_card(id, target).await {
        Ok(DragOutcome::Committed { source, target, .. }) => {
            println!("- {name}: {source} -> {target} committed");
        }
        Ok(DragOutcome::RolledBack { source, reason, .. }) => {
            println!("- {name}: rolled back to {source} ({reason})");
        }
        Ok(other) => println!("- {name}: {other:?}"),
        Err(rejected) => println!("- {name}: {rejected}"),
    }
}

fn render_board(view: &BoardView) {
    if !view.filter.is_unfiltered() {
        println!(
            "Filter: search '{}' | job {}",
            view.filter.search,
            String::from(view.filter.job.clone())
        );
    }
    for column in &view.columns {
        let marker = if column.terminal { " (final)" } else { "" };
        println!("{}{}: {}", column.label, marker, column.count);
        for application in &column.applications {
            let rating = application
                .rating()
                .map(|stars| format!(" | rating {stars}/5"))
                .unwrap_or_default();
            println!(
                "  - {} <{}> | {}{}",
                application.candidate.name,
                application.candidate.email,
                application.job_title,
                rating
            );
        }
    }
    for anomaly in &view.anomalies {
        println!(
            "! {} has status '{}' and is not shown in any column",
            anomaly.application_id.as_str(),
            anomaly.raw_status
        );
    }
    for notification in &view.notifications {
        let level = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        println!("[{level}] {}", notification.message);
    }
}

fn render_report(report: &BulkReport) {
    println!("- {}", report.summary());
    for failure in &report.failed {
        println!(
            "  - {} failed: {}",
            failure.application_id.as_str(),
            failure.reason
        );
    }
    if !report.is_empty() && !report.refreshed {
        println!("  - board could not be reloaded afterwards");
    }
}
