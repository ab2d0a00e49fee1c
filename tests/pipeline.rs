// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

mod common;

use std::sync::Arc;

use common::{hard_hat_pipeline, write_image};
use image::Rgb;
use ppe_ensemble::input::collect_images;
use ppe_ensemble::output::{write_summary, AnnotatedWriter, SUMMARY_FILE};
use ppe_ensemble::{run_batch, BBox, ClassTaxonomy, Frame, ImageOutcome, PipelineConfig};

#[test]
fn test_batch_writes_annotations_and_summary() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_image(input.path(), "a.png", 200, 200);
    write_image(input.path(), "b.jpg", 120, 80);
    std::fs::write(input.path().join("c.png"), b"not an image").unwrap();
    std::fs::write(input.path().join("readme.txt"), b"ignored").unwrap();

    let images = collect_images(input.path()).unwrap();
    assert_eq!(images.len(), 3);

    let taxonomy = Arc::new(ClassTaxonomy::default());
    let pipelines = (0..2)
        .map(|_| hard_hat_pipeline(&taxonomy, PipelineConfig::default()))
        .collect();
    let writer = AnnotatedWriter::new(output.path(), taxonomy.clone(), None).unwrap();
    let summary = run_batch(pipelines, &images, &writer, None).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_detections, 2);

    let first = summary.outcomes[0].result().unwrap();
    assert_eq!(first.source(), images[0].as_path());
    let det = first.detections()[0];
    assert_eq!(*det.bbox(), BBox::new(10., 10., 40., 40.));
    assert_eq!(det.score(), 0.9);
    assert_eq!(det.frame(), Frame::ImageSpace);
    assert!(matches!(summary.outcomes[2], ImageOutcome::Failure { .. }));

    let annotated = image::open(output.path().join("a.png")).unwrap().to_rgb8();
    assert_eq!(*annotated.get_pixel(10, 20), Rgb([0, 0, 255]));
    assert!(output.path().join("b.jpg").exists());
    assert!(!output.path().join("c.png").exists());

    let path = write_summary(output.path(), &summary, &taxonomy).unwrap();
    assert_eq!(path.file_name().unwrap(), SUMMARY_FILE);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["processed"], 2);
    assert_eq!(json["outcomes"][2]["status"], "failure");
}

#[test]
fn test_parallel_ensemble_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "site.png", 160, 100);
    let taxonomy = Arc::new(ClassTaxonomy::default());

    let mut sequential = hard_hat_pipeline(&taxonomy, PipelineConfig::default());
    let mut parallel = hard_hat_pipeline(
        &taxonomy,
        PipelineConfig {
            parallel_ensemble: true,
            ..PipelineConfig::default()
        },
    );
    let (a, _) = sequential.process_path(&image);
    let (b, _) = parallel.process_path(&image);
    assert!(a.is_success());
    assert_eq!(a, b);
}

#[test]
fn test_batch_outcomes_keep_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let images: Vec<_> = (0..12)
        .map(|i| write_image(dir.path(), &format!("img_{:02}.png", i), 40 + i, 30))
        .collect();
    let taxonomy = Arc::new(ClassTaxonomy::default());
    let pipelines = (0..4)
        .map(|_| hard_hat_pipeline(&taxonomy, PipelineConfig::default()))
        .collect();

    let summary = run_batch(pipelines, &images, &ppe_ensemble::pipeline::NullSink, None).unwrap();
    for (outcome, path) in summary.outcomes.iter().zip(&images) {
        assert_eq!(outcome.source(), path.as_path());
        assert_eq!(outcome.result().unwrap().dimensions().0, image::image_dimensions(path).unwrap().0);
    }
}
