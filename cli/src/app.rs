//! CLI assembly: merge flags over config, build the registry, run, report, upload.
use std::path::PathBuf;
use std::time::Duration;

use diagkit_core::attach::{upload_files, AttachSettings, UploadFile};
use diagkit_core::config::AppConfig;
use diagkit_core::error::CliError;
use diagkit_core::output::{write_summary, ScriptData, StatusFilter};
use diagkit_core::task::TaskIdentifier;
use diagkit_core::{ExecutionEngine, RunReport, RunRequest, TaskRegistry};
use diagkit_plugins::factory;
use diagkit_plugins::tasks::k8s::NAMESPACE_OPTION;
use diagkit_plugins::tasks::OverrideSpec;

use crate::commands::cli::Args;

#[tracing::instrument(name = "cli.run_app", skip(args, cfg))]
pub async fn run_app_with_config(args: Args, cfg: AppConfig) -> Result<i32, CliError> {
    let mut registry = factory::build_registry(&cfg)?;
    let overrides = parse_overrides(&args.overrides)?;
    factory::apply_overrides(&mut registry, &overrides)?;

    if args.list {
        print!("{}", task_listing(&registry));
        return Ok(0);
    }

    let mut options = factory::build_options(&cfg);
    if let Some(ns) = args.namespace.as_deref().filter(|ns| !ns.trim().is_empty()) {
        options = options.with(NAMESPACE_OPTION, ns);
    }

    let filter = match args.filter.as_deref() {
        Some(raw) => StatusFilter::parse(raw).map_err(CliError::Config)?,
        None => cfg.output.filter,
    };
    let request = build_request(&args, &cfg, filter)?;
    tracing::debug!(
        roots = ?request.roots,
        filter = %filter,
        output_dir = %request.output_dir.display(),
        "run request assembled"
    );

    let engine =
        ExecutionEngine::new(registry, options).with_max_concurrency(cfg.output.max_concurrency);
    let renderer = factory::build_renderer(args.format.as_str());

    let report = diagkit_core::run(&engine, request, renderer.clone()).await?;
    write_summary(&report.results, &filter, renderer.as_ref());

    if let Some(err) = report.archive.as_ref().and_then(|a| a.include_error.as_ref()) {
        eprintln!("Warning: include skipped: {err}");
    }

    if let Some(key) = args.attach_key.as_deref().filter(|k| !k.trim().is_empty()) {
        let settings = AttachSettings::resolve(
            args.attachment_endpoint.as_deref(),
            cfg.attach.endpoint.as_deref(),
            Some(Duration::from_secs(cfg.attach.timeout_secs)),
        );
        tracing::info!(endpoint = %settings.endpoint, "uploading results");
        let client = factory::build_attach_client(&settings)?;
        let files = upload_targets(&report)
            .iter()
            .map(UploadFile::from_path)
            .collect::<Result<Vec<_>, _>>()?;
        for url in upload_files(client.as_ref(), key, &files).await? {
            println!("Uploaded: {url}");
        }
    }

    Ok(0)
}

fn parse_overrides(raw: &[String]) -> Result<Vec<OverrideSpec>, CliError> {
    raw.iter()
        .map(|s| s.parse().map_err(|e: diagkit_plugins::tasks::OverrideParseError| CliError::Config(e.to_string())))
        .collect()
}

fn parse_roots(raw: &[String]) -> Result<Option<Vec<TaskIdentifier>>, CliError> {
    let ids: Vec<&str> = raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if ids.is_empty() {
        return Ok(None);
    }
    ids.into_iter()
        .map(|id| {
            id.parse()
                .map_err(|e: diagkit_core::error::IdentifierError| CliError::Config(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn build_request(args: &Args, cfg: &AppConfig, filter: StatusFilter) -> Result<RunRequest, CliError> {
    let script = args.script_output.as_ref().map(|out| {
        args.script_files
            .iter()
            .fold(ScriptData::new(out), |data, f| data.with_file(f))
    });
    Ok(RunRequest {
        roots: parse_roots(&args.tasks)?,
        filter,
        output_dir: args
            .output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&cfg.output.directory)),
        archive_name: cfg.output.archive_name.clone(),
        skip_archive: args.no_archive,
        include: args.include.clone(),
        script,
        ..RunRequest::default()
    })
}

/// Archive when one was built, otherwise the bare output document.
fn upload_targets(report: &RunReport) -> Vec<PathBuf> {
    match &report.archive {
        Some(archive) => vec![archive.path.clone()],
        None => vec![report.output_document.clone()],
    }
}

fn task_listing(registry: &TaskRegistry) -> String {
    let width = registry
        .identifiers()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0);
    registry
        .registrations()
        .map(|(id, reg)| format!("{:<width$}  {}\n", id.as_str(), reg.task.explain()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roots_parse_and_blank_means_all() {
        assert_eq!(parse_roots(&[]).unwrap(), None);
        assert_eq!(parse_roots(&[" ".to_string()]).unwrap(), None);

        let roots = parse_roots(&["Base/Env/InitSystem".to_string()]).unwrap().unwrap();
        assert_eq!(roots[0].to_string(), "Base/Env/InitSystem");

        assert!(matches!(
            parse_roots(&["Base/Env".to_string()]),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_request_prefers_flags_over_config() {
        let args = Args::parse_from([
            "diagkit",
            "--output-path",
            "/tmp/out",
            "--no-archive",
            "--script-output",
            "script.log",
            "--script-file",
            "extra.txt",
        ]);
        let request = build_request(&args, &AppConfig::default(), StatusFilter::all()).unwrap();
        assert_eq!(request.output_dir, PathBuf::from("/tmp/out"));
        assert!(request.skip_archive);
        let script = request.script.unwrap();
        assert_eq!(script.output_path, PathBuf::from("script.log"));
        assert_eq!(script.addtl_files, vec![PathBuf::from("extra.txt")]);
    }

    #[test]
    fn test_request_falls_back_to_config() {
        let args = Args::parse_from(["diagkit"]);
        let mut cfg = AppConfig::default();
        cfg.output.directory = "reports".into();
        let request = build_request(&args, &cfg, StatusFilter::default()).unwrap();
        assert_eq!(request.output_dir, PathBuf::from("reports"));
        assert_eq!(request.roots, None);
        assert!(request.script.is_none());
    }

    #[test]
    fn test_bad_override_is_config_error() {
        assert!(matches!(
            parse_overrides(&["nonsense".to_string()]),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_listing_is_ordered_and_aligned() {
        let registry = factory::build_registry(&AppConfig::default()).unwrap();
        let listing = task_listing(&registry);
        let ids: Vec<&str> = listing
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert!(listing.contains("Base/Config/AppName"));
    }
}
