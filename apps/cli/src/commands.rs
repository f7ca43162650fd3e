use analysis::{dashboard, Transformer};
use anyhow::{Context, Result};
use gt_capture::run_capture;
use gt_ingest_core::{channel, logging::component_span, GtConfig, TelemetryRx, TelemetrySource};
use gt_ingest_gt7::{ClientState, GtClient};
use iox::{ContainerWriter, VehicleCatalog};
use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::warn;

fn catalog(cfg: &GtConfig) -> Result<Arc<VehicleCatalog>> {
    let catalog = VehicleCatalog::load(cfg.vehicle_db.as_deref())?;
    if catalog.is_sample() {
        warn!(cars = catalog.len(), "using the sample vehicle catalog, pass --vehicle-db for the full inventory");
    }
    Ok(Arc::new(catalog))
}

pub async fn monitor(cfg: GtConfig, every: Duration) -> Result<()> {
    let catalog = catalog(&cfg)?;
    let stats_enabled = cfg.stats_enabled;
    let client = Arc::new(GtClient::new(cfg, component_span("client")));
    let state = client.state();
    let (tx, rx) = channel();

    let ingest = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.run(tx).await }
    });
    let printer = tokio::task::spawn_blocking(move || print_frames(&rx, catalog, &state, stats_enabled, every));

    ingest.await.context("ingest task")??;
    printer.await.context("printer task")?
}

fn print_frames(
    rx: &TelemetryRx,
    catalog: Arc<VehicleCatalog>,
    state: &ClientState,
    stats_enabled: bool,
    every: Duration,
) -> Result<()> {
    let mut transformer = Transformer::new(catalog);
    let mut last_print: Option<Instant> = None;
    let mut out = io::stdout().lock();

    for sample in rx.iter() {
        transformer.update(sample.frame);
        if last_print.is_some_and(|at| at.elapsed() < every) {
            continue;
        }
        last_print = Some(Instant::now());

        let mut line = dashboard(&transformer);
        if stats_enabled {
            line["stats"] = serde_json::to_value(&*state.statistics())?;
        }
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

pub async fn capture(cfg: GtConfig, output: PathBuf) -> Result<()> {
    let writer = ContainerWriter::create(&output)?;
    let catalog = catalog(&cfg)?;
    let client = Arc::new(GtClient::new(cfg, component_span("client")));
    let (tx, rx) = channel();

    let mut ingest = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.run(tx).await }
    });
    let span = component_span("capture");
    let mut capture = tokio::task::spawn_blocking(move || run_capture(&rx, writer, catalog, span));

    let summary = tokio::select! {
        res = &mut capture => res.context("capture task")??,
        res = &mut ingest => {
            res.context("ingest task")??;
            capture.await.context("capture task")??
        }
    };
    // stops the heartbeat as well
    ingest.abort();

    match &summary.session {
        Some(session) => println!(
            "{}: {} frames, {} dropped, session {}",
            output.display(),
            summary.packets_written,
            session.dropped_frames,
            session.id.simple()
        ),
        None => println!("{}: no session started", output.display()),
    }
    Ok(())
}
