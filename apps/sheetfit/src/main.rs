use anyhow::Result;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheetfit::config::Config;
use sheetfit::errors::LayoutError;
use sheetfit::layout::layout_document;
use sheetfit::models::SheetDocument;
use sheetfit::render::DisplayList;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting sheetfit v{}", env!("CARGO_PKG_VERSION"));

    let document = SheetDocument::from_path(&config.input)?;
    let options = config.layout_options();
    info!(
        input = %config.input.display(),
        sections = document.sheet.sections.len(),
        effort = ?options.effort,
        "Loaded sheet document"
    );

    let report = match layout_document(document, options).await {
        Ok(report) => report,
        Err(e @ LayoutError::ExtentTooSmall(_)) => {
            error!(code = e.code(), error = %e, "could not produce this page");
            anyhow::bail!("could not produce this page: {e}");
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "layout failed");
            return Err(e.into());
        }
    };

    let pages: Vec<DisplayList> = report.pages.iter().map(DisplayList::for_page).collect();
    let output = json!({
        "pages": pages,
        "fills": report.fills,
        "advisories": report.advisories,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
