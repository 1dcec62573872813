//! DXGI output-duplication frame source for the primary display.
//!
//! All the unsafe Win32 surface lives here; the rest of the crate only sees
//! [`FrameSource`]. Lost-duplication errors (session switch, fullscreen
//! exclusive handoff) drop the duplication handle and reinitialize lazily
//! on the next tick.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use log::{info, warn};

use windows::core::Interface;
use windows::Win32::Foundation::POINT;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_FLAG, D3D11_MAPPED_SUBRESOURCE, D3D11_MAP_READ,
    D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource, DXGI_ERROR_ACCESS_LOST,
    DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};
use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

use super::frame::Frame;
use super::source::FrameSource;

/// Per-attempt wait for a new desktop frame.
const ACQUIRE_TIMEOUT_MS: u32 = 100;
const JPEG_QUALITY: u8 = 70;

pub struct DuplicationSource {
    device: Option<ID3D11Device>,
    context: Option<ID3D11DeviceContext>,
    duplication: Option<IDXGIOutputDuplication>,
}

impl DuplicationSource {
    pub fn new() -> Self {
        Self {
            device: None,
            context: None,
            duplication: None,
        }
    }

    fn init_duplication(&mut self) -> Result<()> {
        let device = self
            .device
            .as_ref()
            .context("D3D11 device not initialized")?;

        let dxgi_device: IDXGIDevice = device.cast().context("device is not an IDXGIDevice")?;
        let duplication = unsafe {
            let adapter = dxgi_device.GetAdapter().context("GetAdapter failed")?;
            let output = adapter
                .EnumOutputs(0)
                .context("no primary output to duplicate")?;
            let output1: IDXGIOutput1 = output.cast().context("output lacks duplication API")?;
            output1
                .DuplicateOutput(device)
                .context("DuplicateOutput failed")?
        };

        self.duplication = Some(duplication);
        info!("Output duplication initialized for primary display");
        Ok(())
    }

    fn cursor_position() -> (i32, i32) {
        let mut point = POINT::default();
        match unsafe { GetCursorPos(&mut point) } {
            Ok(()) => (point.x, point.y),
            Err(_) => (0, 0),
        }
    }

    /// Copy the acquired GPU texture through a staging surface and encode
    /// the BGRA pixels as JPEG.
    fn read_frame(&self, texture: &ID3D11Texture2D) -> Result<(Vec<u8>, u32, u32)> {
        let device = self
            .device
            .as_ref()
            .context("D3D11 device not initialized")?;
        let context = self
            .context
            .as_ref()
            .context("D3D11 context not initialized")?;

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
            ..desc
        };

        let mut staging: Option<ID3D11Texture2D> = None;
        unsafe {
            device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))
                .context("staging texture creation failed")?;
        }
        let staging = staging.context("staging texture missing after creation")?;

        let (width, height) = (desc.Width, desc.Height);
        let mut bgra = vec![0u8; (width * height * 4) as usize];

        unsafe {
            context.CopyResource(&staging, texture);

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            context
                .Map(&staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                .context("staging map failed")?;

            let pitch = mapped.RowPitch as usize;
            let src = std::slice::from_raw_parts(mapped.pData as *const u8, pitch * height as usize);
            let row_bytes = (width * 4) as usize;
            for row in 0..height as usize {
                let src_off = row * pitch;
                let dst_off = row * row_bytes;
                bgra[dst_off..dst_off + row_bytes]
                    .copy_from_slice(&src[src_off..src_off + row_bytes]);
            }

            context.Unmap(&staging, 0);
        }

        let jpeg = encode_jpeg(&bgra, width, height)?;
        Ok((jpeg, width, height))
    }
}

impl FrameSource for DuplicationSource {
    fn start(&mut self) -> Result<()> {
        let mut device: Option<ID3D11Device> = None;
        let mut context: Option<ID3D11DeviceContext> = None;
        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                Default::default(),
                D3D11_CREATE_DEVICE_FLAG(0),
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
            .context("D3D11CreateDevice failed")?;
        }

        self.device = device;
        self.context = context;
        self.init_duplication()
    }

    fn stop(&mut self) {
        self.duplication = None;
        self.context = None;
        self.device = None;
    }

    fn capture_one(&mut self) -> Option<Frame> {
        if self.duplication.is_none() {
            if let Err(err) = self.init_duplication() {
                warn!("duplication reinit failed: {err:#}");
                return None;
            }
        }
        let duplication = self.duplication.as_ref()?;

        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;
        let acquired = unsafe {
            duplication.AcquireNextFrame(ACQUIRE_TIMEOUT_MS, &mut frame_info, &mut resource)
        };

        if let Err(err) = acquired {
            match err.code() {
                code if code == DXGI_ERROR_WAIT_TIMEOUT => {}
                code if code == DXGI_ERROR_ACCESS_LOST => {
                    warn!("output duplication lost; will reinitialize next tick");
                    self.duplication = None;
                }
                code => warn!("AcquireNextFrame failed: {code}"),
            }
            return None;
        }

        let result = resource
            .as_ref()
            .and_then(|res| res.cast::<ID3D11Texture2D>().ok())
            .map(|texture| self.read_frame(&texture));

        unsafe {
            let _ = duplication.ReleaseFrame();
        }

        match result {
            Some(Ok((jpeg, width, height))) => {
                let (cursor_x, cursor_y) = Self::cursor_position();
                Some(Frame::new(
                    jpeg,
                    chrono::Utc::now(),
                    width,
                    height,
                    cursor_x,
                    cursor_y,
                ))
            }
            Some(Err(err)) => {
                warn!("frame readback failed: {err:#}");
                None
            }
            None => None,
        }
    }
}

impl Drop for DuplicationSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn encode_jpeg(bgra: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in bgra.chunks_exact(4) {
        rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(&rgb, width, height, ExtendedColorType::Rgb8)
        .context("jpeg encode failed")?;
    Ok(out)
}
