// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// PPE 集成检测 (批处理)
///
/// 流程:
/// 1. 加载类别表, 扫描PPE模型目录
/// 2. 每个工作线程加载一套模型 (人体检测 + 全部PPE模型)
/// 3. 批量处理输入图片, 写出标注图片与 summary.json
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use ppe_ensemble::input::collect_images;
use ppe_ensemble::models::{discover_ppe_models, PersonDetector, PpeDetector, YOLOv8, YOLOv8Config};
use ppe_ensemble::output::{write_summary, AnnotatedWriter};
use ppe_ensemble::renderer::load_font;
use ppe_ensemble::{run_batch, Args, ClassTaxonomy, Pipeline, PipelineConfig};

fn model_config(args: &Args, model: PathBuf) -> YOLOv8Config {
    YOLOv8Config {
        model,
        width: args.width,
        height: args.height,
        conf: args.model_conf,
        iou: args.model_iou,
        cuda: args.cuda,
        device_id: args.device_id,
        profile: args.profile,
    }
}

fn build_pipeline(
    args: &Args,
    ppe_models: &[PathBuf],
    taxonomy: &Arc<ClassTaxonomy>,
    config: &PipelineConfig,
) -> Result<Pipeline> {
    let person = YOLOv8::new(model_config(args, args.person_model.clone()))?;
    let mut ppe: Vec<Box<dyn PpeDetector>> = Vec::with_capacity(ppe_models.len());
    for path in ppe_models {
        ppe.push(Box::new(YOLOv8::new(model_config(args, path.clone()))?));
    }
    let person: Box<dyn PersonDetector> = Box::new(person);
    Ok(Pipeline::new(person, ppe, taxonomy.clone(), config.clone())?)
}

fn run(args: Args) -> Result<()> {
    let config = PipelineConfig::from_args(&args)?;
    let taxonomy = Arc::new(match &args.taxonomy {
        Some(path) => ClassTaxonomy::from_json_file(path)?,
        None => ClassTaxonomy::default(),
    });

    // 先确认有PPE模型, 再加载任何模型
    let ppe_models = discover_ppe_models(&args.ppe_models_dir)?;
    if ppe_models.is_empty() {
        bail!(
            "no PPE models (ppe_fold_*.onnx) found in {}",
            args.ppe_models_dir.display()
        );
    }
    info!("found {} PPE models", ppe_models.len());

    let images = collect_images(&args.input_dir)?;
    if images.is_empty() {
        bail!("no images found at {} (png, jpg, jpeg)", args.input_dir.display());
    }

    let workers = config.workers.min(images.len());
    let mut pipelines = Vec::with_capacity(workers);
    for _ in 0..workers {
        pipelines.push(build_pipeline(&args, &ppe_models, &taxonomy, &config)?);
    }
    if let Some(first) = pipelines.first() {
        info!(
            "{} workers ready, person model + {} PPE models each",
            workers,
            first.ensemble_size()
        );
    }

    let font = match &args.font {
        Some(path) => Some(load_font(path)?),
        None => None,
    };
    let writer = AnnotatedWriter::new(&args.output_dir, taxonomy.clone(), font)
        .with_context(|| format!("cannot prepare output dir {}", args.output_dir.display()))?;

    let summary = run_batch(pipelines, &images, &writer, config.batch_timeout)?;
    write_summary(&args.output_dir, &summary, &taxonomy)?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
