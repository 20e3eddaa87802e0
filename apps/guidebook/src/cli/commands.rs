//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::catalog::{Catalog, CatalogIssue};
use crate::config::GuidebookConfig;
use guidebook_core::{
    CoverageReport, CoverageStatus, Field, GuideError, PageContext, PolicyConflict, ProbeOutcome,
    RequestLocale, ResolutionTrace,
};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// HELPERS
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn request_locale(lang: Option<String>) -> RequestLocale {
    RequestLocale {
        requested: lang,
        path: None,
    }
}

fn describe_outcome(outcome: &ProbeOutcome) -> String {
    match outcome {
        ProbeOutcome::Absent => "absent".to_string(),
        ProbeOutcome::Placeholder(reason) => {
            let reason = format!("{:?}", reason).to_lowercase();
            format!("placeholder({})", reason)
        }
        ProbeOutcome::ReferenceEcho => "reference-echo".to_string(),
        ProbeOutcome::Meaningful => "meaningful".to_string(),
    }
}

/// One-line rendering of a trace: `tier=outcome -> tier=outcome`.
fn describe_trace(trace: &ResolutionTrace) -> String {
    let mut steps: Vec<String> = trace
        .probes
        .iter()
        .map(|probe| format!("{}={}", probe.tier, describe_outcome(&probe.outcome)))
        .collect();
    if trace.halted {
        steps.push("halted".to_string());
    }
    if steps.is_empty() {
        format!("({:?})", trace.origin).to_lowercase()
    } else {
        steps.join(" -> ")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    mut config: GuidebookConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), GuideError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.server_addr();
    let catalog = Catalog::load(config)?;

    println!("Guidebook Renderer Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Content:  {}", catalog.config().content_dir.display());
    println!(
        "  Pages:    {} ({})",
        catalog.page_count(),
        catalog.config().pages_file.display()
    );
    println!("  Bundles:  {}", catalog.bundles().len());
    println!();
    println!("Endpoints:");
    println!("  GET  /pages                       - List pages");
    println!("  GET  /pages/{{key}}?lang=           - Render a page");
    println!("  GET  /pages/{{key}}/fields/{{field}}  - Resolve one field");
    println!("  GET  /render/{{lang}}/{{guides}}/{{slug}} - Render by path");
    println!("  GET  /coverage?lang=              - Coverage report");
    println!("  POST /cache/reset                 - Reset the context cache");
    println!("  POST /reload                      - Reload bundles and pages");
    println!("  GET  /health                      - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&addr, catalog).await
}

// =============================================================================
// PAGES COMMAND
// =============================================================================

/// List declared pages.
pub fn cmd_pages(config: GuidebookConfig, json_mode: bool) -> Result<(), GuideError> {
    let catalog = Catalog::load(config)?;

    if json_mode {
        let pages: Vec<api::PageSummary> = catalog
            .pages()
            .map(api::PageSummary::from_declaration)
            .collect();
        print_json(&pages);
        return Ok(());
    }

    println!("Guidebook Pages");
    println!("===============");
    println!(
        "Locales: {}",
        catalog
            .locales()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    if catalog.page_count() == 0 {
        println!("No pages declared.");
        return Ok(());
    }
    for page in catalog.pages() {
        let policies = if page.policy_names().is_empty() {
            String::from("-")
        } else {
            page.policy_names().join(", ")
        };
        println!(
            "  {:<32} /{}/{}  policies: {}",
            page.key(),
            page.guides_slug(),
            page.slug(),
            policies
        );
    }

    Ok(())
}

// =============================================================================
// RENDER COMMAND
// =============================================================================

/// Render a page context.
pub fn cmd_render(
    config: GuidebookConfig,
    page_key: &str,
    lang: Option<String>,
    json_mode: bool,
    verbose: bool,
) -> Result<(), GuideError> {
    let catalog = Catalog::load(config)?;
    let page = catalog.page(page_key)?;
    let traced = catalog
        .assembler()
        .assemble_traced(page, &request_locale(lang));
    let context = &traced.context;

    if json_mode {
        print_json(context);
        return Ok(());
    }

    print_context(context);

    if verbose {
        println!();
        println!("Cascade traces:");
        for (field, trace) in &traced.traces {
            println!("  {:<14} {}", field.name(), describe_trace(trace));
        }
    }

    Ok(())
}

fn print_context(context: &PageContext) {
    let locales = context.locales();
    println!("Page: {} ({})", context.page(), context.slug());
    println!(
        "Locale: {} (reference {})  Localized: {}",
        locales.target,
        locales.reference,
        yes_no(context.is_localized())
    );
    println!();
    println!("Title:       {}", context.title().value());
    println!("Description: {}", context.description().value());
    println!(
        "Breadcrumb:  {}",
        context
            .breadcrumb()
            .value()
            .iter()
            .map(|item| format!("{} <{}>", item.label, item.href))
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!();
    println!("Intro:    {} paragraph(s)", context.intro().value().len());
    println!("Sections: {}", context.sections().value().len());
    println!(
        "FAQs:     {} under \"{}\"",
        context.faqs().value().len(),
        context.faqs_heading().value()
    );
    if !context.toc().value().is_empty() {
        println!("ToC:");
        for item in context.toc().value() {
            println!("  {:<24} {}", item.href, item.label);
        }
    }
    println!();
    println!("Tiers:");
    for (field, tier) in context.tiers() {
        println!("  {:<14} {}", field, tier);
    }
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Resolve one field of a page.
pub fn cmd_resolve(
    config: GuidebookConfig,
    page_key: &str,
    field_name: &str,
    lang: Option<String>,
    trace: bool,
    json_mode: bool,
) -> Result<(), GuideError> {
    let catalog = Catalog::load(config)?;
    let page = catalog.page(page_key)?;
    let field = Field::parse(field_name)?;
    let request = request_locale(lang);
    let assembler = catalog.assembler();
    let resolution = assembler.resolve_field(page, &field, &request)?;

    if json_mode {
        let output = api::FieldResponse {
            page: page.key().to_string(),
            locales: assembler.locales(&request),
            field: resolution.field,
            trace: trace.then_some(resolution.trace),
        };
        print_json(&output);
        return Ok(());
    }

    let locales = assembler.locales(&request);
    println!("{}.{} [{}]", page.key(), field.name(), locales.target);
    println!("Tier:     {}", resolution.field.tier());
    println!("Fallback: {}", yes_no(resolution.field.is_fallback()));
    println!(
        "Value:    {}",
        serde_json::to_string_pretty(resolution.field.value()).unwrap_or_default()
    );
    if trace {
        println!();
        println!("Trace:");
        for probe in &resolution.trace.probes {
            let key = probe
                .key
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!(
                "  {:<30} {:<24} {}",
                probe.tier,
                describe_outcome(&probe.outcome),
                key
            );
        }
        if resolution.trace.halted {
            println!("  (halted on reference echo)");
        }
    }

    Ok(())
}

// =============================================================================
// COVERAGE COMMAND
// =============================================================================

/// Report localization coverage.
pub fn cmd_coverage(
    config: GuidebookConfig,
    lang: Option<&str>,
    json_mode: bool,
) -> Result<(), GuideError> {
    let catalog = Catalog::load(config)?;
    let locales = match lang {
        Some(raw) => vec![
            catalog
                .locale_resolver()
                .normalize(raw)
                .ok_or_else(|| GuideError::InvalidLocale(raw.to_string()))?,
        ],
        None => catalog.locales(),
    };
    let report = CoverageReport::build(&catalog.assembler(), catalog.pages(), &locales);

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Localization Coverage");
    println!("=====================");
    for (locale, summary) in &report.locales {
        println!();
        println!(
            "[{}] {}/{} pages localized  fields: {} localized, {} fallback, {} missing",
            locale,
            summary.localized_pages,
            summary.pages,
            summary.localized_fields,
            summary.fallback_fields,
            summary.missing_fields
        );
        for row in report.for_locale(locale) {
            let fallbacks: Vec<String> = row
                .fields
                .iter()
                .filter(|f| f.status == CoverageStatus::Fallback)
                .map(|f| format!("{}@{}", f.field, f.tier))
                .collect();
            println!(
                "  {:<32} localized: {:<3} {}",
                row.page,
                yes_no(row.localized),
                fallbacks.join(" ")
            );
        }
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    pages: usize,
    bundles: usize,
    policies: Vec<&'a str>,
    skipped: &'a [CatalogIssue],
    conflicts: BTreeMap<String, Vec<PolicyConflict>>,
}

/// Validate configuration, bundles and page policies.
///
/// Policy conflicts are reported, not failed: precedence decides them.
pub fn cmd_check(config: GuidebookConfig, strict: bool, json_mode: bool) -> Result<(), GuideError> {
    let catalog = Catalog::load(config)?;
    let conflicts: BTreeMap<String, Vec<PolicyConflict>> = catalog
        .pages()
        .map(|page| (page.key().to_string(), page.conflicts()))
        .filter(|(_, conflicts)| !conflicts.is_empty())
        .collect();
    let report = CheckReport {
        pages: catalog.page_count(),
        bundles: catalog.bundles().len(),
        policies: catalog.registry().names().collect(),
        skipped: catalog.issues(),
        conflicts,
    };

    if json_mode {
        print_json(&report);
    } else {
        println!("Guidebook Check");
        println!("===============");
        println!("Pages:   {}", report.pages);
        println!("Bundles: {}", report.bundles);
        println!("Policies: {}", report.policies.join(", "));
        if !report.skipped.is_empty() {
            println!();
            println!("Skipped bundle files:");
            for issue in report.skipped {
                println!("  {} - {}", issue.path, issue.reason);
            }
        }
        if !report.conflicts.is_empty() {
            println!();
            println!("Policy precedence applied:");
            for (page, conflicts) in &report.conflicts {
                for conflict in conflicts {
                    println!("  {:<32} {}", page, describe_conflict(conflict));
                }
            }
        }
    }

    if strict && !report.skipped.is_empty() {
        return Err(GuideError::ConfigError(format!(
            "{} bundle file(s) skipped",
            report.skipped.len()
        )));
    }
    Ok(())
}

fn describe_conflict(conflict: &PolicyConflict) -> String {
    match conflict {
        PolicyConflict::StopOutranksPreferGeneric => {
            "stop_at_active_locale outranks prefer_generic_when_fallback".to_string()
        }
        PolicyConflict::OverrideOutranksFlags(field) => {
            format!("override of {} outranks cascade flags", field)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
