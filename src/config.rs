use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReaderError, ReaderResult};

/// 回退分章窗口大小（字符数）
pub const DEFAULT_FALLBACK_WINDOW: usize = 10_000;
/// 候选标题行的最短长度（去除首尾空白后的字符数）
pub const DEFAULT_MIN_TITLE_CHARS: usize = 2;
/// 候选标题行的最长长度
pub const DEFAULT_MAX_TITLE_CHARS: usize = 50;
/// 自动生成的默认分卷标题
pub const DEFAULT_VOLUME_TITLE: &str = "正文";

/// 覆盖回退窗口大小的环境变量
pub const FALLBACK_WINDOW_ENV: &str = "DEEP_READER_FALLBACK_WINDOW";

/// 目录解析配置
///
/// JSON 配置文件中缺省的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// 无法识别任何章节时，每个合成章节的字符数
    pub fallback_window: usize,
    /// 候选标题行最短字符数
    pub min_title_chars: usize,
    /// 候选标题行最长字符数
    pub max_title_chars: usize,
    /// 默认分卷标题
    pub default_volume_title: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fallback_window: DEFAULT_FALLBACK_WINDOW,
            min_title_chars: DEFAULT_MIN_TITLE_CHARS,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            default_volume_title: DEFAULT_VOLUME_TITLE.to_string(),
        }
    }
}

impl ExtractorConfig {
    /// 从 JSON 字符串解析配置并校验
    pub fn from_json_str(json: &str) -> ReaderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置
    pub fn load(path: &Path) -> ReaderResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 应用环境变量覆盖
    ///
    /// 目前只支持 `DEEP_READER_FALLBACK_WINDOW`
    pub fn with_env_overrides(mut self) -> ReaderResult<Self> {
        if let Ok(raw) = std::env::var(FALLBACK_WINDOW_ENV) {
            self.fallback_window = parse_window(&raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// 校验配置取值
    pub fn validate(&self) -> ReaderResult<()> {
        if self.fallback_window == 0 {
            return Err(ReaderError::Config("fallback_window 必须大于 0".to_string()));
        }
        if self.min_title_chars == 0 {
            return Err(ReaderError::Config("min_title_chars 必须大于 0".to_string()));
        }
        if self.min_title_chars > self.max_title_chars {
            return Err(ReaderError::Config(format!(
                "min_title_chars ({}) 不能大于 max_title_chars ({})",
                self.min_title_chars, self.max_title_chars
            )));
        }
        if self.default_volume_title.trim().is_empty() {
            return Err(ReaderError::Config("default_volume_title 不能为空".to_string()));
        }
        Ok(())
    }
}

fn parse_window(raw: &str) -> ReaderResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| ReaderError::Config(format!("{} 无效 ({}): {}", FALLBACK_WINDOW_ENV, raw, e)))
}
