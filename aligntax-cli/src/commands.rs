//! CLI subcommand handlers.

use aligntax_core::config::{self, OutputFormat};
use aligntax_core::report::{self, FitSummary, ParetoSummary, Report};
use aligntax_core::{AlignmentTaxQuantifier, AppConfig, Metric, Scale};
use anyhow::Context;
use std::path::Path;

use crate::{Commands, ConfigAction};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, config_path),
        Commands::Bench {
            method,
            model,
            baseline,
            format,
            json,
        } => handle_bench(
            &load(workspace, config_path)?,
            BenchArgs {
                method: method.as_deref(),
                model: model.as_deref(),
                baseline,
                format: format.as_deref(),
                json: json.as_deref(),
            },
        ),
        Commands::Fit {
            method,
            metric,
            predict,
            format,
        } => handle_fit(
            &load(workspace, config_path)?,
            method.as_deref(),
            &metric,
            &predict,
            format.as_deref(),
        ),
        Commands::Pareto {
            model,
            metric,
            format,
        } => handle_pareto(
            &load(workspace, config_path)?,
            &model,
            &metric,
            format.as_deref(),
        ),
        Commands::Methods => {
            let config = load(workspace, config_path)?;
            println!("{}", report::render_table(&config.overheads));
            Ok(())
        }
    }
}

fn load(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    if config_path.is_none() && !config::config_exists(Some(workspace)) {
        tracing::info!("No configuration file found, using built-in overhead table");
    }
    config::load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

struct BenchArgs<'a> {
    method: Option<&'a str>,
    model: Option<&'a str>,
    baseline: Option<f64>,
    format: Option<&'a str>,
    json: Option<&'a Path>,
}

fn output_format(config: &AppConfig, flag: Option<&str>) -> anyhow::Result<OutputFormat> {
    match flag {
        Some(f) => Ok(f.parse()?),
        None => Ok(config.report.format),
    }
}

fn handle_bench(config: &AppConfig, args: BenchArgs<'_>) -> anyhow::Result<()> {
    let format = output_format(config, args.format)?;
    let scale = args.model.map(str::parse::<Scale>).transpose()?;

    let mut quantifier = AlignmentTaxQuantifier::new(config);
    if let Some(score) = args.baseline {
        quantifier.set_task_score_baseline(score)?;
    }
    let results = quantifier.benchmark(args.method, scale)?;

    if let Some(path) = args.json {
        quantifier
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match format {
        OutputFormat::Table => {
            println!("{}", quantifier.comparative_report(config.report.precision));
            if args.method.is_some() {
                println!();
                for r in &results {
                    println!("{}", r.summary());
                }
            }
        }
        OutputFormat::Json => println!("{}", quantifier.to_json()?),
    }
    Ok(())
}

fn handle_fit(
    config: &AppConfig,
    method: Option<&str>,
    metric: &str,
    predict: &[String],
    format: Option<&str>,
) -> anyhow::Result<()> {
    let format = output_format(config, format)?;
    let metric: Metric = metric.parse()?;
    let targets = predict
        .iter()
        .map(|p| p.parse::<Scale>())
        .collect::<Result<Vec<_>, _>>()?;

    let quantifier = AlignmentTaxQuantifier::new(config);
    let fits = match method {
        Some(m) => vec![(m.to_string(), quantifier.fit(m, metric, None))],
        None => quantifier.fit_all(metric),
    };

    let single = method.is_some();
    let mut summaries = Vec::new();
    for (method, fit) in fits {
        let curve = match fit {
            Ok(curve) => curve,
            // a named method must fit; across all methods, report and keep going
            Err(e) if single => return Err(e.into()),
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "Skipping method");
                eprintln!("  {}: fit failed: {}", method, e);
                continue;
            }
        };
        let predictions = targets
            .iter()
            .map(|s| curve.predict(s.as_f64()))
            .collect::<Result<Vec<_>, _>>()?;
        summaries.push(FitSummary {
            method,
            metric,
            curve,
            predictions,
        });
    }

    match format {
        OutputFormat::Table => {
            for summary in &summaries {
                println!("{}", report::render_fit(summary));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }
    Ok(())
}

fn handle_pareto(
    config: &AppConfig,
    model: &str,
    metric: &str,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let format = output_format(config, format)?;
    let scale: Scale = model.parse()?;
    let axis: Metric = metric.parse()?;

    let quantifier = AlignmentTaxQuantifier::new(config);
    let summary = ParetoSummary {
        scale,
        axis,
        frontier: quantifier.pareto(scale, axis)?,
    };

    match format {
        OutputFormat::Table => println!("{}", report::render_pareto(&summary)),
        OutputFormat::Json => {
            let mut report = Report::new(Vec::new());
            report.pareto = Some(summary);
            println!("{}", report.to_json()?);
        }
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_file = config::workspace_config_path(workspace);
            if config_file.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_file.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_file.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let toml_str = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&config_file, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_file.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = config::load_config(Some(workspace), config_path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
