//! Source decoding.
//!
//! | Source | Crate / function |
//! |---|---|
//! | JPEG, PNG, WebP, GIF, BMP, TIFF | `image::ImageReader` (format sniffed from magic bytes) |
//! | AVIF | `avif-parse` (container) + `rav1d` (AV1 decode) + BT.601 YUV→RGB |
//! | JPEG XL | `jpegxl-rs` (libjxl), behind the `jxl` feature |
//!
//! The `image` crate's `avif` feature only brings the rav1e encoder; its AVIF
//! decoder needs the C dav1d library. AVIF sources are therefore sniffed by
//! `image` but decoded here with `rav1d`, the pure Rust port of dav1d.
//!
//! Every path reads through a [`CountingReader`] so the caller learns how many
//! encoded bytes the source occupied.

use super::counting::CountingReader;
use super::error::ImagingError;
use super::params::SourceFormat;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufReader, Read, Seek};

/// JPEG XL bare codestream signature.
const JXL_CODESTREAM: [u8; 2] = [0xFF, 0x0A];
/// JPEG XL ISOBMFF container signature box.
const JXL_CONTAINER: [u8; 12] = [0, 0, 0, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A];

/// A decoded source plus what was learned while reading it.
pub(crate) struct Decoded {
    pub image: DynamicImage,
    pub format: SourceFormat,
    /// Encoded size of the source in bytes.
    pub bytes_read: u64,
}

pub(crate) fn is_jxl(header: &[u8]) -> bool {
    header.starts_with(&JXL_CODESTREAM) || header.starts_with(&JXL_CONTAINER)
}

/// Decode `source` from its current position.
///
/// `header` is the peeked start of the stream, used to spot JPEG XL, which
/// `image` does not recognise.
pub(crate) fn decode_source<R: Read + Seek>(
    source: R,
    header: &[u8],
) -> Result<Decoded, ImagingError> {
    let mut counting = CountingReader::new(BufReader::new(source));

    if is_jxl(header) {
        let bytes = read_remaining(&mut counting)?;
        return Ok(Decoded {
            image: decode_jxl(&bytes)?,
            format: SourceFormat::Jxl,
            bytes_read: counting.bytes_read(),
        });
    }

    let reader = ImageReader::new(&mut counting).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ImagingError::Decode("unrecognized image format".into()))?;

    let image = if format == ImageFormat::Avif {
        let bytes = read_remaining(reader.into_inner())?;
        decode_avif(&bytes)?
    } else {
        reader
            .decode()
            .map_err(|e| ImagingError::Decode(e.to_string()))?
    };

    Ok(Decoded {
        image,
        format: format.into(),
        bytes_read: counting.bytes_read(),
    })
}

fn read_remaining<R: Read>(mut reader: R) -> Result<Vec<u8>, ImagingError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

// =============================================================================
// AVIF
// =============================================================================

/// Decode the primary item of an AVIF file. Alpha items are ignored.
pub(crate) fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::mem::MaybeUninit;
    use std::ptr::NonNull;

    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
        .map_err(|e| ImagingError::Decode(format!("AVIF container: {e:?}")))?;
    let av1_bytes: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(ImagingError::Decode(format!("rav1d open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(ImagingError::Decode("rav1d data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf, av1_bytes.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(ImagingError::Decode(format!("rav1d send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(ImagingError::Decode(format!("rav1d get_picture failed ({})", rc.0)));
    }

    let converted = picture_to_rgb(&pic);

    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }

    let (width, height, rgb) = converted.map_err(ImagingError::Decode)?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| ImagingError::Decode("AVIF pixel buffer does not match its size".into()))
}

/// Convert a decoded picture to interleaved RGB8. The picture must still be
/// referenced.
fn picture_to_rgb(
    pic: &rav1d::include::dav1d::picture::Dav1dPicture,
) -> Result<(u32, u32, Vec<u8>), String> {
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;

    let plane = |i: usize, stride: isize| {
        pic.data[i]
            .map(|p| Plane {
                ptr: p.as_ptr() as *const u8,
                stride,
            })
            .ok_or_else(|| format!("AVIF picture is missing plane {i}"))
    };

    let luma = plane(0, pic.stride[0])?;
    let (chroma, ss_x, ss_y) = if layout == DAV1D_PIXEL_LAYOUT_I400 {
        (None, false, false)
    } else {
        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            other => return Err(format!("unsupported AVIF pixel layout: {other}")),
        };
        let cb = plane(1, pic.stride[1])?;
        let cr = plane(2, pic.stride[1])?;
        (Some((cb, cr)), ss_x, ss_y)
    };

    let yuv = YuvPicture {
        luma,
        chroma,
        width,
        height,
        bpc,
        ss_x,
        ss_y,
    };
    Ok((width, height, yuv.to_rgb()))
}

#[derive(Clone, Copy)]
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// Sample at `(x, y)`. Depths above 8 bits are stored as `u16`.
    fn sample(self, x: u32, y: u32, bpc: u32) -> f32 {
        let row = y as isize * self.stride;
        if bpc <= 8 {
            (unsafe { *self.ptr.offset(row + x as isize) }) as f32
        } else {
            (unsafe { *(self.ptr.offset(row + x as isize * 2) as *const u16) }) as f32
        }
    }
}

struct YuvPicture {
    luma: Plane,
    /// `None` for monochrome pictures.
    chroma: Option<(Plane, Plane)>,
    width: u32,
    height: u32,
    bpc: u32,
    ss_x: bool,
    ss_y: bool,
}

impl YuvPicture {
    /// BT.601 YCbCr → RGB, scaled to 8 bits.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let luma = self.luma.sample(x, y, self.bpc);
                let pixel = match self.chroma {
                    None => [luma; 3],
                    Some((cb, cr)) => {
                        let cx = if self.ss_x { x / 2 } else { x };
                        let cy = if self.ss_y { y / 2 } else { y };
                        let cb = cb.sample(cx, cy, self.bpc) - center;
                        let cr = cr.sample(cx, cy, self.bpc) - center;
                        [
                            luma + 1.402 * cr,
                            luma - 0.344136 * cb - 0.714136 * cr,
                            luma + 1.772 * cb,
                        ]
                    }
                };
                rgb.extend(pixel.map(|v| (v * scale).clamp(0.0, 255.0) as u8));
            }
        }
        rgb
    }
}

// =============================================================================
// JPEG XL
// =============================================================================

#[cfg(feature = "jxl")]
pub(crate) fn decode_jxl(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    use image::{GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

    let decoder = jpegxl_rs::decoder_builder()
        .build()
        .map_err(|e| ImagingError::Decode(format!("libjxl: {e}")))?;
    let (meta, pixels) = decoder
        .decode_with::<u8>(bytes)
        .map_err(|e| ImagingError::Decode(format!("libjxl: {e}")))?;

    let (w, h) = (meta.width, meta.height);
    let image = match (meta.num_color_channels, meta.has_alpha_channel) {
        (1, false) => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        (1, true) => GrayAlphaImage::from_raw(w, h, pixels).map(DynamicImage::ImageLumaA8),
        (_, false) => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        (_, true) => RgbaImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
    };
    image.ok_or_else(|| ImagingError::Decode("JPEG XL pixel buffer does not match its size".into()))
}

#[cfg(not(feature = "jxl"))]
pub(crate) fn decode_jxl(_bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    Err(ImagingError::Decode(
        "JPEG XL decoding is not available in this build".into(),
    ))
}
