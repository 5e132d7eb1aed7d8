//! DDS container assembly for reconstructed image mips

use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, NewDxgiParams};

use super::image::ImageFormat;
use crate::error::{Error, Result};

/// Wrap a single mip in a DX10 DDS container.
///
/// The header is built from the image dimensions and format, with its
/// linear size set to the payload length; `pixels` follows unchanged.
///
/// # Errors
/// Returns [`Error::DdsCreateFailed`] if the header cannot be built or
/// written.
pub fn assemble_dds(width: u32, height: u32, format: ImageFormat, pixels: Vec<u8>) -> Result<Vec<u8>> {
    let mut dds = Dds::new_dxgi(NewDxgiParams {
        height,
        width,
        depth: None,
        format: format.dxgi(),
        mipmap_levels: None,
        array_layers: None,
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Straight,
    })
    .map_err(|e| Error::DdsCreateFailed {
        message: e.to_string(),
    })?;

    dds.header.pitch = None;
    dds.header.linear_size = Some(pixels.len() as u32);
    dds.data = pixels;

    let mut output = Vec::with_capacity(dds.data.len() + 148);
    dds.write(&mut output).map_err(|e| Error::DdsCreateFailed {
        message: e.to_string(),
    })?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dds_layout() {
        let pixels = vec![0x11u8; 8 * 8];
        let out = assemble_dds(8, 8, ImageFormat::Bc3, pixels.clone()).unwrap();

        assert_eq!(&out[..4], b"DDS ");
        assert!(out.ends_with(&pixels));
        // magic + header + DX10 header
        assert_eq!(out.len(), 4 + 124 + 20 + pixels.len());
    }
}
