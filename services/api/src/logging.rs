//! 日志系统模块职责：
//! 1. 初始化 stdout + 文件双通道 tracing 日志。
//! 2. 将运行日志按天落在 `logs/raw` 目录。
//! 3. 定期清理超过保留天数的历史日志文件。

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// 默认日志根目录（相对当前工作目录）。
const DEFAULT_LOG_DIR: &str = "logs";
/// 日志原始文件目录名。
const RAW_DIR_NAME: &str = "raw";
/// 默认保留天数。
const DEFAULT_RETENTION_DAYS: i64 = 14;
/// 清理任务轮询周期（秒）。
const PRUNE_INTERVAL_SEC: u64 = 3600;
/// 日志目录环境变量。
const LOG_DIR_ENV: &str = "SOFTCLIN_LOG_DIR";
/// 文件日志级别环境变量（独立于 `RUST_LOG`）。
const FILE_LOG_LEVEL_ENV: &str = "SOFTCLIN_FILE_LOG_LEVEL";
/// 日志保留天数环境变量。
const RETENTION_DAYS_ENV: &str = "SOFTCLIN_LOG_RETENTION_DAYS";
/// stdout 默认日志过滤（人类可读摘要）。
const DEFAULT_STDOUT_FILTER: &str = "info";

/// 日志运行时守卫，防止 non-blocking writer 提前析构。
pub(crate) struct LogRuntime {
    _stdout_guard: WorkerGuard,
    _file_guard: WorkerGuard,
    _pruner: JoinHandle<()>,
}

/// 初始化日志系统，并启动历史日志清理任务。
pub(crate) fn init(service_name: &str) -> Result<LogRuntime> {
    let raw_dir = resolve_log_root().join(RAW_DIR_NAME);
    fs::create_dir_all(&raw_dir)
        .with_context(|| format!("create raw log dir: {}", raw_dir.display()))?;

    let retention_days = retention_days();
    prune_expired_logs(&raw_dir, Local::now().date_naive(), retention_days)?;

    let file_appender = tracing_appender::rolling::daily(&raw_dir, format!("{service_name}.log"));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(stdout_writer)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(resolve_stdout_env_filter());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(resolve_file_level_filter());

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(LogRuntime {
        _stdout_guard: stdout_guard,
        _file_guard: file_guard,
        _pruner: spawn_prune_task(raw_dir, retention_days),
    })
}

/// 解析 stdout 日志过滤规则：优先 `RUST_LOG`，回退默认摘要级别。
fn resolve_stdout_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_STDOUT_FILTER))
}

/// 解析文件日志级别；默认保留 `debug`。
fn resolve_file_level_filter() -> LevelFilter {
    std::env::var(FILE_LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::DEBUG)
}

fn spawn_prune_task(raw_dir: PathBuf, retention_days: i64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(PRUNE_INTERVAL_SEC));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = prune_expired_logs(&raw_dir, Local::now().date_naive(), retention_days)
            {
                warn!("prune logs failed: {err}");
            }
        }
    })
}

/// 将环境变量中的日志路径解析成绝对路径。
fn resolve_log_root() -> PathBuf {
    let raw = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => PathBuf::from(DEFAULT_LOG_DIR),
    }
}

fn retention_days() -> i64 {
    std::env::var(RETENTION_DAYS_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// 删除日期早于 `today - retention_days` 的日志文件，返回删除数量。
fn prune_expired_logs(raw_dir: &Path, today: NaiveDate, retention_days: i64) -> Result<usize> {
    if !raw_dir.exists() {
        return Ok(0);
    }
    let cutoff = today - chrono::Duration::days(retention_days);
    let mut removed = 0;

    for entry in
        fs::read_dir(raw_dir).with_context(|| format!("read raw logs: {}", raw_dir.display()))?
    {
        let entry = entry.with_context(|| format!("read entry under {}", raw_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(day) = path
            .file_name()
            .and_then(|value| value.to_str())
            .and_then(extract_day_from_log_name)
        else {
            continue;
        };
        if day >= cutoff {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => warn!("remove log {} failed: {err}", path.display()),
        }
    }

    if removed > 0 {
        debug!("pruned {removed} log files older than {cutoff}");
    }
    Ok(removed)
}

/// 从日志文件名中提取日期（格式：`<name>.log.YYYY-MM-DD`）。
fn extract_day_from_log_name(file_name: &str) -> Option<NaiveDate> {
    let day = file_name.rsplit('.').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
