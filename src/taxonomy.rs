// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! PPE 类别表 (Class taxonomy)
//!
//! 进程级只读配置: 启动时加载一次, 之后通过 `Arc` 在各工作线程间共享.
//! 仅用于标注/渲染, 不参与检测逻辑.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PpeError, Result};

/// 人体检测模型中"人"的类别 (COCO person = 0), 与PPE类别空间无关
pub const PERSON_CLASS_ID: u32 = 0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: u32,
    pub name: String,
    /// RGB
    pub color: [u8; 3],
}

#[derive(Deserialize)]
struct TaxonomyFile {
    classes: Vec<ClassInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassTaxonomy {
    classes: BTreeMap<u32, ClassInfo>,
}

impl Default for ClassTaxonomy {
    /// 默认PPE类别
    fn default() -> Self {
        let defaults = [
            (0, "hard-hat", [0, 0, 255]),
            (1, "gloves", [0, 255, 0]),
            (2, "mask", [255, 0, 0]),
            (3, "glasses", [0, 255, 255]),
            (4, "boots", [255, 0, 255]),
            (5, "vest", [255, 255, 0]),
            (6, "ppe-suit", [128, 0, 128]),
        ];
        let classes = defaults
            .into_iter()
            .map(|(id, name, color)| {
                let info = ClassInfo {
                    id,
                    name: name.to_string(),
                    color,
                };
                (id, info)
            })
            .collect();
        Self { classes }
    }
}

impl ClassTaxonomy {
    pub fn from_classes(classes: Vec<ClassInfo>) -> Result<Self> {
        if classes.is_empty() {
            return Err(PpeError::config("class taxonomy is empty"));
        }
        let mut map = BTreeMap::new();
        for class in classes {
            let id = class.id;
            if map.insert(id, class).is_some() {
                return Err(PpeError::config(format!(
                    "class taxonomy defines id {} more than once",
                    id
                )));
            }
        }
        Ok(Self { classes: map })
    }

    /// JSON格式: `{"classes": [{"id": 0, "name": "hard-hat", "color": [0, 0, 255]}, ...]}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: TaxonomyFile = serde_json::from_str(json)
            .map_err(|e| PpeError::config(format!("invalid taxonomy json: {}", e)))?;
        Self::from_classes(file.classes)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| PpeError::io(path, e))?;
        Self::from_json_str(&json).map_err(|e| match e {
            PpeError::Configuration(msg) => {
                PpeError::config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.classes.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&ClassInfo> {
        self.classes.get(&id)
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    pub fn color(&self, id: u32) -> Option<[u8; 3]> {
        self.get(id).map(|c| c.color)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// 校验模型输出的全部类别 (0..num_classes) 都在类别表中
    pub fn validate_classes(&self, model: &str, num_classes: usize) -> Result<()> {
        let missing: Vec<String> = (0..num_classes as u32)
            .filter(|id| !self.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PpeError::config(format!(
                "model '{}' emits class ids [{}] missing from the taxonomy",
                model,
                missing.join(", ")
            )))
        }
    }
}
