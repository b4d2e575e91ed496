use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logger() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "qpaper=info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// 截断长文本用于日志显示
pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > max_chars {
        first_line.chars().take(max_chars).collect::<String>() + "..."
    } else {
        first_line.to_string()
    }
}
