mod config;
mod crawler;
mod export;
mod parser;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use tracing::{info, warn};

use config::{AppConfig, SourceConfig};
use crawler::{Collector, ImageDownloader, PageFetcher};
use export::ExportFormat;
use parser::QuestionRecord;
use storage::Database;
use utils::logger;

#[derive(Parser)]
#[command(name = "qpaper")]
#[command(about = "从渲染后的网页中提取试题并汇编成卷", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化配置、数据目录和题库
    Init,
    /// 从一组来源页面采集题目
    Collect {
        /// 来源：http(s) 地址或本地 HTML 快照
        sources: Vec<String>,
        /// 使用 config/sources.toml 中的来源集合
        #[arg(short, long)]
        set: Option<String>,
        /// 解析相对图片地址的基础URL
        #[arg(long)]
        base_url: Option<String>,
        /// 结果 JSON 输出路径
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 不写入题库
        #[arg(long)]
        no_save: bool,
    },
    /// 导出题目
    Export {
        /// 题目 JSON；缺省时从题库读取
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
        /// 题号选择，如 "1-3,7"
        #[arg(long)]
        select: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 下载所选题目的配图
    Download {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        select: Option<String>,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// 查看最近的采集记录
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// 清理导出文件、图片和题库
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("qpaper 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Collect {
            sources,
            set,
            base_url,
            output,
            no_save,
        } => {
            collect_command(sources, set, base_url, output, no_save).await?;
        }
        Commands::Export {
            input,
            format,
            select,
            output,
        } => {
            export_command(input, format, select, output).await?;
        }
        Commands::Download { input, select, dir } => {
            download_command(input, select, dir).await?;
        }
        Commands::History { limit } => {
            history_command(limit).await?;
        }
        Commands::Clean => {
            clean_command().await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化系统...");

    let app_config = AppConfig::default();
    tokio::fs::create_dir_all(&app_config.storage.images_dir).await?;
    tokio::fs::create_dir_all(&app_config.storage.output_dir).await?;
    tokio::fs::create_dir_all("config").await?;

    app_config.save(config::SETTINGS_PATH)?;
    info!("已生成配置文件: {}", config::SETTINGS_PATH);

    let source_toml = toml::to_string_pretty(&SourceConfig::default())?;
    tokio::fs::write(config::sources::SOURCES_PATH, source_toml).await?;
    info!("已生成来源配置: {}", config::sources::SOURCES_PATH);

    let db = Database::new(&app_config.storage.database_path).await?;
    db.init_schema().await?;

    info!("✅ 系统初始化完成！");
    info!("下一步:");
    info!("  1. 编辑 {} 添加试卷来源", config::sources::SOURCES_PATH);
    info!("  2. 运行 'qpaper collect --set <名称>' 或 'qpaper collect <地址/快照>...'");
    Ok(())
}

async fn collect_command(
    mut sources: Vec<String>,
    set: Option<String>,
    base_url: Option<String>,
    output: Option<PathBuf>,
    no_save: bool,
) -> Result<()> {
    let app_config = AppConfig::load()?;

    let mut base_url = base_url;
    if let Some(name) = set {
        let source_config = SourceConfig::load()?;
        let source_set = source_config
            .find(&name)
            .with_context(|| format!("未找到启用的来源集合: {}", name))?;
        info!("使用来源集合 {} ({} 个来源)", source_set.name, source_set.sources.len());
        sources.extend(source_set.sources.iter().cloned());
        if base_url.is_none() {
            base_url = source_set.base_url.clone();
        }
    }

    let base_url = base_url
        .map(|u| Url::parse(&u).with_context(|| format!("无效的基础URL: {}", u)))
        .transpose()?;

    let fetcher = PageFetcher::new(&app_config.fetcher)?.with_base_url(base_url);
    let collector = Collector::new(&app_config, fetcher);
    let sources = collector.validate_sources(&sources)?;

    info!("开始采集 {} 个来源...", sources.len());
    let outcome = collector.spawn(sources).await.context("采集任务异常终止")?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(&app_config.storage.output_dir).join(format!(
            "questions_{}.json",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });
    let records: Vec<(usize, &QuestionRecord)> =
        outcome.questions.iter().enumerate().map(|(i, q)| (i + 1, q)).collect();
    export::write_output(&output, &export::render_json(&records)?)?;

    if no_save {
        info!("已跳过写入题库");
    } else {
        let db = Database::new(&app_config.storage.database_path).await?;
        db.init_schema().await?;
        db.save_questions(&outcome.questions, app_config.extractor.max_images_per_question)
            .await?;
        for page in &outcome.pages {
            db.record_run(&page.source, page.question_count, None).await?;
        }
        for failure in &outcome.failures {
            db.record_run(&failure.source, 0, Some(&failure.message)).await?;
        }
    }

    if outcome.questions.is_empty() {
        warn!("⚠️ 所有来源中都没有找到有效的题目，请检查来源页面是否已完整展开");
    }

    if outcome.failures.is_empty() {
        info!("✅ 采集完成: {} 道题 -> {}", outcome.questions.len(), output.display());
    } else {
        warn!(
            "⚠️ 采集部分完成: {} 道题, {} 个来源失败 -> {}",
            outcome.questions.len(),
            outcome.failures.len(),
            output.display()
        );
    }
    Ok(())
}

async fn load_questions(app_config: &AppConfig, input: Option<PathBuf>) -> Result<Vec<QuestionRecord>> {
    match input {
        Some(path) => export::load_json(&path)
            .with_context(|| format!("读取题目文件失败: {}", path.display())),
        None => {
            let db = Database::new(&app_config.storage.database_path).await?;
            db.init_schema().await?;
            Ok(db.load_questions().await?)
        }
    }
}

async fn export_command(
    input: Option<PathBuf>,
    format: ExportFormat,
    select: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let app_config = AppConfig::load()?;
    let questions = load_questions(&app_config, input).await?;
    if questions.is_empty() {
        info!("没有可导出的题目，请先运行 'qpaper collect'");
        return Ok(());
    }

    let selected = export::select(&questions, select.as_deref())?;
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let content = export::render(format, &selected, &date)?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(&app_config.storage.output_dir)
            .join(format!("questions_{}.{}", date, format.extension()))
    });
    export::write_output(&output, &content)?;

    info!("✅ 导出完成: {} 道题 -> {}", selected.len(), output.display());
    Ok(())
}

async fn download_command(
    input: Option<PathBuf>,
    select: Option<String>,
    dir: Option<PathBuf>,
) -> Result<()> {
    let app_config = AppConfig::load()?;
    let questions = load_questions(&app_config, input).await?;
    let selected = export::select(&questions, select.as_deref())?;

    let dir = dir.unwrap_or_else(|| PathBuf::from(&app_config.storage.images_dir));
    let downloader = ImageDownloader::new(&app_config.fetcher)?;
    let report = downloader.download_all(&selected, &dir).await?;

    if report.failed.is_empty() {
        info!("✅ 已保存 {} 张图片到 {}", report.saved.len(), dir.display());
    } else {
        warn!(
            "⚠️ 已保存 {} 张图片, {} 张失败",
            report.saved.len(),
            report.failed.len()
        );
    }
    Ok(())
}

async fn history_command(limit: i64) -> Result<()> {
    let app_config = AppConfig::load()?;
    let db = Database::new(&app_config.storage.database_path).await?;
    db.init_schema().await?;

    let runs = db.recent_runs(limit).await?;
    if runs.is_empty() {
        info!("暂无采集记录");
        return Ok(());
    }
    for run in runs {
        let when = run.created_at.as_deref().unwrap_or("-");
        match run.error {
            Some(error) => warn!("[{}] {} 失败: {}", when, run.source, logger::preview(&error, 80)),
            None => info!("[{}] {} -> {} 道题", when, run.source, run.question_count),
        }
    }
    Ok(())
}

async fn clean_command() -> Result<()> {
    info!("开始清理数据...");

    let app_config = AppConfig::load().unwrap_or_default();
    let mut total_files = 0u64;

    for dir in [&app_config.storage.images_dir, &app_config.storage.output_dir] {
        match tokio::fs::read_dir(dir).await {
            Ok(mut entries) => {
                let mut count = 0u64;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if path.is_file() {
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            warn!("删除失败 {}: {}", path.display(), e);
                        } else {
                            count += 1;
                        }
                    }
                }
                info!("已清理 {}: {} 个文件", dir, count);
                total_files += count;
            }
            Err(_) => {
                info!("目录不存在，跳过: {}", dir);
            }
        }
    }

    match Database::new(&app_config.storage.database_path).await {
        Ok(db) => {
            db.init_schema().await?;
            db.clear_all_tables().await?;
        }
        Err(e) => {
            info!("数据库连接失败，跳过清空: {}", e);
        }
    }

    info!("✅ 清理完成，共删除 {} 个文件", total_files);
    Ok(())
}
