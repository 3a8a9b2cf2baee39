//! Identity stage
//!
//! Emits every input unchanged except for the output format tag. Useful as a
//! wiring check and as the default stage in tests.

use crate::error::StageBuildError;
use crate::pipeline::types::FrameGeometry;
use crate::stage::{ProcessResult, ProcessingStage, StageFactory, StageParams};

pub struct Passthrough {
    output: FrameGeometry,
}

impl Passthrough {
    pub fn new(params: &StageParams) -> Self {
        Self {
            output: params.geometry.with_format(params.output_format),
        }
    }

    /// Factory building a [`Passthrough`] per worker
    pub fn factory() -> impl StageFactory {
        |params: &StageParams| -> Result<Box<dyn ProcessingStage>, StageBuildError> {
            Ok(Box::new(Passthrough::new(params)))
        }
    }
}

impl ProcessingStage for Passthrough {
    fn process(&mut self, mut frame: crate::pipeline::types::VideoFrame) -> ProcessResult {
        frame.format = self.output.format;
        ProcessResult::Produced(frame)
    }

    fn output_geometry(&self) -> FrameGeometry {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{PixelFormat, Timestamp, VideoFrame};
    use bytes::Bytes;

    #[test]
    fn retags_format_and_keeps_payload() {
        let params = StageParams {
            spec: "null".into(),
            geometry: FrameGeometry::new(320, 240, PixelFormat::Rgba),
            output_format: PixelFormat::Nv12,
            parallelism: 1,
        };
        let mut stage = Passthrough::new(&params);
        assert_eq!(stage.output_geometry().format, PixelFormat::Nv12);

        let frame = VideoFrame::new(
            Bytes::from_static(b"abcd"),
            params.geometry,
            Timestamp::from_micros(0),
        );
        match stage.process(frame) {
            ProcessResult::Produced(out) => {
                assert_eq!(out.format, PixelFormat::Nv12);
                assert_eq!(out.data.as_ref(), b"abcd");
            }
            _ => panic!("passthrough must always produce"),
        }
    }
}
