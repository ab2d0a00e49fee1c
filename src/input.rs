// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 图片输入: 单个文件或目录 (不递归)

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{PpeError, Result};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 收集输入图片, 按路径排序以保证输出顺序稳定
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(PpeError::config(format!(
            "input path is neither file nor directory: {}",
            path.display()
        )));
    }

    let mut images = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| PpeError::io(path, e))? {
        let entry = entry.map_err(|e| PpeError::io(path, e))?;
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        if is_image(&p) {
            images.push(p);
        } else {
            debug!("skipping non-image file {}", p.display());
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "c.jpeg", "notes.txt", "d.bmp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "c.jpeg"]);
    }

    #[test]
    fn test_single_file_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(collect_images(&file).unwrap(), vec![file]);

        let missing = collect_images(&dir.path().join("nope"));
        assert!(matches!(missing, Err(PpeError::Configuration(_))));
    }

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_images(dir.path()).unwrap().is_empty());
    }
}
