//! # RPC Model Sample
//!
//! Walks through the proxy layer against the in-process server:
//! 1. Searching and browsing partners, reading fields and relations.
//! 2. Staging a many-to-many edit through `add` and saving it.
//! 3. Creating a record from a virtual (empty) recordset.
//! 4. Switching the context language and calling a server method by name.

use rpc_model::tracing::setup_tracing;
use rpc_model::ProxyError;
use rpc_model_sample::lifecycle::DemoSystem;
use serde_json::json;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    setup_tracing();
    info!("Starting RPC model demo");

    let system = DemoSystem::new();
    let partner = system.env.model("res.partner")?;

    // Browse every company and its tags
    let span = tracing::info_span!("browse_companies");
    let companies = async {
        let companies = partner.search_browse(json!([["is_company", "=", true]])).await?;
        for company in companies.iter() {
            let name = company.value("name").await?;
            let country = company.related("country_id").await?.value("code").await?;
            let tags = company.related("category_id").await?.name_get().await?;
            info!(%name, %country, ?tags, "Company");
        }
        Ok::<_, ProxyError>(companies)
    }
    .instrument(span)
    .await?;

    // Tag the second company as VIP
    let span = tracing::info_span!("tag_vip");
    async {
        let deco = companies
            .at(1)
            .ok_or_else(|| ProxyError::InternalError("no second company".into()))?;
        let vip = system
            .env
            .model("res.partner.category")?
            .search(json!([["name", "=", "VIP"]]))
            .await?;
        let tags = deco.related("category_id").await?;
        let commands = tags.add_and_stage(vip)?;
        info!(staged = ?commands, "Staged tag link");
        deco.save().await?;
        let category_id = deco.value("category_id").await?;
        info!(%category_id, "Saved");
        Ok::<_, ProxyError>(())
    }
    .instrument(span)
    .await?;

    // Create a contact from a virtual record
    let draft = partner.browse(()).await?;
    draft.stage("name", "Gemini Furniture")?;
    draft.stage("email", "gemini@example.com")?;
    let created = draft.save().await?;
    info!(record = %created, "Created contact");

    // Switch language and call a method by name
    let french = partner.with_context([("lang", "fr_FR")]);
    let count = french.call("search_count")?.arg(json!([])).send().await?;
    info!(lang = ?french.env().lang(), %count, "Counted partners");

    match created.call("action_archive")?.send().await {
        Ok(result) => info!(%result, "Archived"),
        Err(e) => error!(error = %e, "Server rejected call"),
    }

    system.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}
