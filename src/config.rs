//! 负责处理应用的持久化配置。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

const CONFIG_DIR_NAME: &str = "karaoke-helper";
const CONFIG_FILE_NAME: &str = "karaoke_config.json";

/// 渲染时用到的资源路径。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct KaraokeConfig {
    /// 字体目录，传给 `subtitles` 滤镜的 `fontsdir`。
    pub fonts_dir: PathBuf,
    /// 存放 `gerisayım {N}.mov` 倒计时片段的目录。
    pub countdown_dir: PathBuf,
    /// 片头四秒显示的标志图片。
    pub logo_path: PathBuf,
    /// 第一段歌词开始前使用的背景视频。
    pub background_first: Option<PathBuf>,
    /// 第一段歌词开始后使用的背景视频。
    pub background_rest: Option<PathBuf>,
    /// 编辑 ASS 文件时使用的外部编辑器命令。
    pub editor: String,
}

impl Default for KaraokeConfig {
    fn default() -> Self {
        Self {
            fonts_dir: PathBuf::from("/app/fonts"),
            countdown_dir: PathBuf::from("/app/gerisayim"),
            logo_path: PathBuf::from("/app/public/osslogo.png"),
            background_first: Some(PathBuf::from("/app/effects/background-first.mp4")),
            background_rest: Some(PathBuf::from("/app/effects/background.mp4")),
            editor: "nano".to_string(),
        }
    }
}

/// 获取应用配置目录下指定文件的完整路径。
///
/// # 参数
/// * `filename` - 目标配置文件的名称，例如 "karaoke_config.json"。
pub(crate) fn get_config_file_path(filename: &str) -> std::result::Result<PathBuf, std::io::Error> {
    if let Some(mut config_dir) = dirs::config_dir() {
        config_dir.push(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir)?;
        config_dir.push(filename);
        Ok(config_dir)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "无法找到用户配置目录",
        ))
    }
}

/// 从用户配置目录加载配置，文件不存在时返回默认配置。
pub fn load_config() -> Result<KaraokeConfig> {
    let config_path = get_config_file_path(CONFIG_FILE_NAME)?;
    load_config_from(&config_path)
}

/// 将配置保存到用户配置目录。
pub fn save_config(config: &KaraokeConfig) -> Result<()> {
    let config_path = get_config_file_path(CONFIG_FILE_NAME)?;
    save_config_to(&config_path, config)
}

/// 从指定文件加载配置，文件不存在时返回默认配置。
pub fn load_config_from(path: &Path) -> Result<KaraokeConfig> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let config: KaraokeConfig = serde_json::from_str(&content)?;
            info!("已从 {:?} 加载配置。", path);
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("配置文件 {:?} 不存在，使用默认配置。", path);
            Ok(KaraokeConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// 将配置序列化为 JSON 并保存到指定文件。
pub fn save_config_to(path: &Path, config: &KaraokeConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    info!("配置已保存到 {:?}。", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, KaraokeConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = KaraokeConfig {
            countdown_dir: PathBuf::from("/tmp/gerisayim"),
            background_rest: None,
            ..Default::default()
        };
        save_config_to(&path, &config).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"editor": "vim"}"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.editor, "vim");
        assert_eq!(config.fonts_dir, PathBuf::from("/app/fonts"));
    }
}
