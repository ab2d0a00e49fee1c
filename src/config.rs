// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 运行参数 (命令行) 与流水线配置
//!
//! 配置对象在启动时构建一次, 显式传入流水线, 不使用全局变量.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use crate::detection::nms::{NmsThresholds, DEFAULT_IOU_THRESHOLD, DEFAULT_SCORE_THRESHOLD};
use crate::error::{PpeError, Result};

/// 模型推理输入尺寸
pub const INF_SIZE: u32 = 640;
/// 人框最低置信度
pub const DEFAULT_PERSON_CONF: f32 = 0.25;
/// 单模型后处理置信度阈值
pub const DEFAULT_MODEL_CONF: f32 = 0.25;
/// 单模型后处理 NMS 阈值
pub const DEFAULT_MODEL_IOU: f32 = 0.45;

/// 人员 + PPE 集成检测
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Object detection for persons and PPE", long_about = None)]
pub struct Args {
    /// 输入图片目录 (或单张图片)
    #[arg(long)]
    pub input_dir: PathBuf,

    /// 输出目录 (标注图片 + summary.json)
    #[arg(long)]
    pub output_dir: PathBuf,

    /// 人体检测模型 (ONNX)
    #[arg(long)]
    pub person_model: PathBuf,

    /// PPE模型目录 (ppe_fold_*.onnx)
    #[arg(long)]
    pub ppe_models_dir: PathBuf,

    /// 类别表 JSON, 缺省使用内置PPE类别
    #[arg(long)]
    pub taxonomy: Option<PathBuf>,

    /// 集成NMS IoU阈值
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub iou: f32,

    /// 集成NMS 分数阈值
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    pub score: f32,

    /// 人框最低置信度
    #[arg(long, default_value_t = DEFAULT_PERSON_CONF)]
    pub person_conf: f32,

    /// 单模型置信度阈值
    #[arg(long, default_value_t = DEFAULT_MODEL_CONF)]
    pub model_conf: f32,

    /// 单模型 NMS IoU阈值
    #[arg(long, default_value_t = DEFAULT_MODEL_IOU)]
    pub model_iou: f32,

    /// 模型输入宽度
    #[arg(long, default_value_t = INF_SIZE)]
    pub width: u32,

    /// 模型输入高度
    #[arg(long, default_value_t = INF_SIZE)]
    pub height: u32,

    /// 工作线程数 (每个线程持有一套模型), 缺省为CPU核数
    #[arg(long)]
    pub workers: Option<usize>,

    /// 同一裁剪图上的PPE模型并行推理
    #[arg(long)]
    pub parallel_ensemble: bool,

    /// 批次超时 (秒), 超时后剩余图片跳过
    #[arg(long)]
    pub batch_timeout_secs: Option<u64>,

    /// 标签字体 (TTF/OTF), 缺省只画框
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 使用CUDA
    #[arg(long)]
    pub cuda: bool,

    /// 设备ID
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// 打印各阶段耗时
    #[arg(long)]
    pub profile: bool,
}

/// 流水线配置
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub thresholds: NmsThresholds,
    pub person_conf: f32,
    pub parallel_ensemble: bool,
    pub workers: usize,
    pub batch_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: NmsThresholds::default(),
            person_conf: DEFAULT_PERSON_CONF,
            parallel_ensemble: false,
            workers: 1,
            batch_timeout: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let workers = args.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let config = Self {
            thresholds: NmsThresholds {
                iou: args.iou,
                score: args.score,
            },
            person_conf: args.person_conf,
            parallel_ensemble: args.parallel_ensemble,
            workers,
            batch_timeout: args.batch_timeout_secs.map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if !(0.0..=1.0).contains(&self.person_conf) {
            return Err(PpeError::config(format!(
                "person confidence must be within [0, 1], got {}",
                self.person_conf
            )));
        }
        if self.workers == 0 {
            return Err(PpeError::config("at least one worker is required"));
        }
        Ok(())
    }
}
