// ==========================================
// 爆破设计引擎 - 命令行入口
// ==========================================
// 用法: blast-design-engine <input.json> [--csv <schedule.csv>] [--db <config.db>]
// 输入: { "sites": [SiteDesign, ...] }
// 输出: JSON 评估报告 (stdout), 日志 (stderr)
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use blast_design_engine::api::{BlastDesignApi, BlastDesignReport, InMemoryBlastSource, SiteDesign};
use blast_design_engine::config::ConfigManager;
use blast_design_engine::domain::SiteScope;
use blast_design_engine::{db, exporter, logging};

#[derive(Debug, Deserialize)]
struct BlastDesignInput {
    sites: Vec<SiteDesign>,
}

#[derive(Debug, Serialize)]
struct SiteOutcome {
    scope: SiteScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<BlastDesignReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Default)]
struct CliArgs {
    input: PathBuf,
    csv: Option<PathBuf>,
    db: Option<String>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut parsed = CliArgs::default();
    let mut input = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => parsed.csv = Some(args.next().context("--csv 缺少文件路径")?.into()),
            "--db" => parsed.db = Some(args.next().context("--db 缺少数据库路径")?),
            "-h" | "--help" => {
                eprintln!("用法: blast-design-engine <input.json> [--csv <schedule.csv>] [--db <config.db>]");
                std::process::exit(0);
            }
            other if input.is_none() => input = Some(PathBuf::from(other)),
            other => bail!("无法识别的参数: {}", other),
        }
    }

    parsed.input = input.context("缺少输入文件 <input.json>")?;
    Ok(parsed)
}

/// 多个爆区时按 project/site 区分 CSV 文件名
fn csv_path_for(base: &Path, scope: SiteScope, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("schedule");
    base.with_file_name(format!("{}_{}_{}.csv", stem, scope.project_id, scope.site_id))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", blast_design_engine::APP_NAME);
    tracing::info!("系统版本: {}", blast_design_engine::VERSION);
    tracing::info!("==================================================");

    let args = parse_args()?;

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("读取输入文件失败: {}", args.input.display()))?;
    let input: BlastDesignInput = serde_json::from_str(&raw).context("输入 JSON 格式错误")?;
    let scopes: Vec<SiteScope> = input.sites.iter().map(|s| s.scope).collect();

    let db_path = args.db.clone().unwrap_or_else(db::default_db_path);
    tracing::info!("使用配置库: {}", db_path);
    let config = ConfigManager::new(&db_path).map_err(|e| anyhow::anyhow!("配置库初始化失败: {}", e))?;

    let source = Arc::new(InMemoryBlastSource::with_sites(input.sites).context("输入爆区数据无效")?);
    let api = BlastDesignApi::from_source(source, Arc::new(config));

    let results = api.evaluate_sites(&scopes).await;
    let multiple = results.len() > 1;

    let mut outcomes = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (scope, result) in results {
        match result {
            Ok(report) => {
                if let Some(base) = &args.csv {
                    exporter::write_schedule_csv(&report.schedule, &csv_path_for(base, scope, multiple))?;
                }
                outcomes.push(SiteOutcome {
                    scope,
                    report: Some(report),
                    error: None,
                });
            }
            Err(e) => {
                failed += 1;
                tracing::error!(scope = %scope, error = %e, "爆区评估失败");
                outcomes.push(SiteOutcome {
                    scope,
                    report: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    println!("{}", exporter::to_json_pretty(&outcomes)?);

    if failed > 0 {
        bail!("{} 个爆区评估失败", failed);
    }
    Ok(())
}
