use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Фильтр по умолчанию, если RUST_LOG не задан
const DEFAULT_FILTER: &str = "info";

/// Инициализация системы трассировки (tracing)
///
/// Логи пишутся в:
/// - stdout (с цветами)
/// - logs/backend.log рядом с исполняемым файлом (без цветов)
pub fn initialize() -> anyhow::Result<()> {
    println!("========================================");
    println!("  LOGGING SYSTEM INITIALIZATION");
    println!("========================================\n");

    let log_dir = log_directory();
    println!("✓ Log directory: {}", log_dir.display());

    let log_file_path = log_dir.join("backend.log");
    let log_file = match open_log_file(&log_dir, &log_file_path) {
        Ok(f) => {
            println!("✓ Log file opened: {}", log_file_path.display());
            f
        }
        Err(e) => {
            println!("✗ ERROR: {}", e);
            println!("  Possible causes:");
            println!("  - Insufficient permissions");
            println!("  - Directory is read-only\n");
            println!("========================================\n");
            return Err(e);
        }
    };

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into());
    println!("✓ Log level: {}", log_level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .init();

    println!("✓ Tracing subscriber initialized");
    println!("========================================\n");

    Ok(())
}

/// Директория логов: рядом с exe, иначе target/logs
fn log_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("logs")))
        .unwrap_or_else(|| Path::new("target").join("logs"))
}

fn open_log_file(log_dir: &Path, log_file_path: &Path) -> anyhow::Result<std::fs::File> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| anyhow::anyhow!("Cannot create log directory {}: {}", log_dir.display(), e))?;

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", log_file_path.display(), e))
}
