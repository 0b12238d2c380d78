use std::env;

use tracing::info;

use uos_hub::{
    helpers::{
        http::portal_client_init,
        reports::{self, HttpReportSource},
    },
    values_of, Attribute, HubConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting UOS Hub report example");

    let config = HubConfig::from_env();
    let department = env::args().nth(1);
    let term = uos_hub::current_term_code().to_string();

    let source = HttpReportSource::new(portal_client_init()?, config.report_url.clone());
    let courses = reports::offered_courses(&source, department.as_deref(), Some(term.as_str())).await?;

    let values = values_of(&courses, &[Attribute::Campus, Attribute::College, Attribute::Department])?;

    for (attribute, map) in &values {
        println!("{attribute}:");
        for (label, code) in map {
            println!("  {code:>6}  {label}");
        }
    }

    Ok(())
}

/*
Run against the live reporting endpoint:

    cargo run --example standalone -- CS

Prints every campus, college and department offering courses this term,
as `code  name` lines. Set UOS_HUB_REPORT_URL to point at another server.
*/
