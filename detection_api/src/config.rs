use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub onnx_file: String,
    pub labels_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_min_probability")]
    pub min_probability: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_min_probability() -> f32 {
    0.25
}

fn default_iou_threshold() -> f32 {
    0.7
}

impl ModelConfig {
    pub fn get_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }

    pub fn get_labels_path(&self) -> PathBuf {
        self.model_dir.join(&self.labels_file)
    }

    /// Anchors a relative `model_dir` to the installation directory.
    pub fn resolve_against(mut self, base_path: &Path) -> Self {
        if self.model_dir.is_relative() {
            self.model_dir = base_path.join(&self.model_dir);
        }
        self
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    load_configuration(&base_path)
}

/// Reads `configuration/` under `base_path`, the service's installation directory.
pub fn load_configuration(base_path: &Path) -> Result<Config, config::ConfigError> {
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut config: Config = config.try_deserialize::<Config>()?;
    config.model = config.model.resolve_against(base_path);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_relative_model_dir_is_anchored_to_base_path() {
        let model = ModelConfig {
            model_dir: PathBuf::from("models"),
            onnx_file: "yolov8m.onnx".to_string(),
            labels_file: "coco_labels.txt".to_string(),
            num_instances: 1,
            min_probability: 0.25,
            iou_threshold: 0.7,
        }
        .resolve_against(Path::new("/opt/detection"));

        assert_eq!(
            model.get_model_path(),
            PathBuf::from("/opt/detection/models/yolov8m.onnx")
        );
        assert_eq!(
            model.get_labels_path(),
            PathBuf::from("/opt/detection/models/coco_labels.txt")
        );
    }

    #[test]
    fn test_absolute_model_dir_is_kept() {
        let model = ModelConfig {
            model_dir: PathBuf::from("/srv/models"),
            onnx_file: "yolov8m.onnx".to_string(),
            labels_file: "coco_labels.txt".to_string(),
            num_instances: 1,
            min_probability: 0.25,
            iou_threshold: 0.7,
        }
        .resolve_against(Path::new("/opt/detection"));

        assert_eq!(model.model_dir, PathBuf::from("/srv/models"));
    }

    #[test]
    fn test_load_configuration_from_base_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let configuration_directory = dir.path().join("configuration");
        fs::create_dir(&configuration_directory).unwrap();
        fs::write(
            configuration_directory.join("base.yaml"),
            "log_level: info\n\
             server:\n  host: 127.0.0.1\n  port: 8123\n\
             model:\n  model_dir: weights\n  onnx_file: tiny.onnx\n  labels_file: labels.txt\n",
        )
        .unwrap();

        let config = load_configuration(dir.path()).unwrap();

        assert_eq!(config.server.get_address(), "127.0.0.1:8123");
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.model.get_model_path(), dir.path().join("weights/tiny.onnx"));
        assert_eq!(config.model.min_probability, 0.25);
        assert!(config.model.num_instances >= 1);
    }

    #[test]
    fn test_log_level_rejects_unknown_values() {
        let level: Result<LogLevel, String> = "trace".to_string().try_into();
        assert!(level.is_err());
        let level: LogLevel = "DEBUG".to_string().try_into().unwrap();
        assert_eq!(level.as_str(), "debug");
    }
}
