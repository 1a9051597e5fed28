// Opens the camera and converts frames into the 0x00RRGGBB buffer the rest
// of the app works on. Frames are optionally mirrored so moving your hand
// right moves the fingertip right on screen.
// Visual expectation: `next_frame()` hands back a FrameBuffer that can go
// straight to the window, or through the ink composite first.

use crate::config::CameraConfig;
use crate::error::Error;
use crate::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

// A small wrapper around nokhwa::Camera so the session loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    mirror: bool,
}

impl CameraCapture {
    /// Open the configured device at (or close to) the requested resolution.
    /// Visual: the camera's activity light turns on.
    pub fn open(cfg: &CameraConfig) -> Result<Self, Error> {
        let idx = CameraIndex::Index(cfg.index);

        let fmt = CameraFormat::new(
            Resolution::new(cfg.width, cfg.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera {}: {e}", cfg.index)))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The stream might pick a slightly different resolution.
        let actual = cam.resolution();
        log::info!(
            "Camera {} streaming at {}x{} (requested {}x{})",
            cfg.index,
            actual.width(),
            actual.height(),
            cfg.width,
            cfg.height
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            mirror: cfg.mirror,
        })
    }

    /// Grab one frame (blocks until the camera delivers it).
    /// Visual: with mirroring on, raising your right hand shows it on the right.
    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        let (w, h) = (w as usize, h as usize);
        let mut out = vec![0u32; w * h];
        for (x, y, pixel) in rgb_img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let dst_x = if self.mirror { w - 1 - x } else { x };
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            out[y * w + dst_x] = (r << 16) | (g << 8) | b;
        }

        Ok(FrameBuffer { width: w, height: h, pixels: out })
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
