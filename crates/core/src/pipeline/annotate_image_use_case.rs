use std::path::Path;

use crate::detection::domain::face_observation::FaceObservation;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::rendering::domain::landmark_renderer::LandmarkRenderer;

/// Single-image landmark pipeline: read → detect → render → write.
pub struct AnnotateImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    detector: Box<dyn LandmarkDetector>,
    renderer: Box<dyn LandmarkRenderer>,
}

impl AnnotateImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        detector: Box<dyn LandmarkDetector>,
        renderer: Box<dyn LandmarkRenderer>,
    ) -> Self {
        Self {
            reader,
            writer,
            detector,
            renderer,
        }
    }

    /// Annotates one image. Fails without writing when no face is found.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<FaceObservation, Box<dyn std::error::Error>> {
        let frame = self.reader.read(input_path)?;

        let observation = self
            .detector
            .detect(&frame)?
            .ok_or_else(|| format!("No face found in {}", input_path.display()))?;

        let rendered = self.renderer.render(&frame, &observation)?;
        self.writer.write(output_path, &rendered)?;
        log::info!(
            "Annotated {} regions in {}",
            observation.region_count(),
            output_path.display()
        );

        Ok(observation)
    }
}
