// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition with the `ocrs` engine (neural models run by `rten`).
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them to
// `$XDG_CACHE_HOME/ocrs` (usually `~/.cache/ocrs`), which is the default
// location; `ocr_model_dir` in the config overrides it.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::batch::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl OcrModels {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// The configured directory, or the ocrs cache directory.
    pub fn resolve(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::in_dir(dir),
            None => Self::in_dir(default_model_dir()),
        }
    }

    /// Both files must exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection, &self.recognition] {
            if !path.is_file() {
                return Err(BlattwerkError::OcrModelMissing(path.clone()));
            }
        }
        Ok(())
    }
}

/// A loaded recogniser. Model loading is the expensive part; build one engine
/// per batch.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        models.validate()?;

        info!("Loading OCR models");
        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                BlattwerkError::OcrError(format!("failed to load model {}: {}", path.display(), err))
            })
        };
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| BlattwerkError::OcrError(format!("failed to initialise OCR engine: {err}")))?;

        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            BlattwerkError::OcrError(format!("cannot use {width}x{height} image: {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| BlattwerkError::OcrError(format!("preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| BlattwerkError::OcrError(format!("recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), "Recognition complete");
        Ok(text)
    }
}

/// Load the engine for a batch.
pub fn load_recognizer(model_dir: Option<&Path>) -> Result<Box<dyn TextRecognizer>> {
    Ok(Box::new(OcrEngine::new(&OcrModels::resolve(model_dir))?))
}
