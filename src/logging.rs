//! 日志初始化
//!
//! 日志统一输出到 stderr，stdout 只用于目录、正文等数据输出。

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ReaderError, ReaderResult};

/// 初始化 tracing subscriber
///
/// `log_level` 优先于 `RUST_LOG`，两者都没有时使用 `info`。
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> ReaderResult<()> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")),
    }
    .map_err(|e| ReaderError::Config(format!("无效的日志级别: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ReaderError::Config(format!("日志初始化失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let result = init_logging(Some("deep_reader=[[["), true);
        assert!(matches!(result, Err(ReaderError::Config(_))));
    }
}
