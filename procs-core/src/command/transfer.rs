use std::sync::Arc;

use pt::{
    BufferAddress, BufferUsages, Extent3d, Origin3d, TextureAspect, TextureDimension,
    TextureFormat, TextureUsages, COPY_BUFFER_ALIGNMENT,
};
use thiserror::Error;

use crate::{
    api_log,
    command::{CommandEncoder, CommandEncoderError},
    global::Global,
    hub::Hub,
    id,
    resource::{resolve, srgb_counterpart, Buffer, Texture},
    storage::InvalidId,
};

/// Required alignment of `bytes_per_row` in copies between buffers and
/// textures.
pub const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Layout of texel data in a buffer or in host memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TexelCopyBufferLayout {
    pub offset: BufferAddress,
    pub bytes_per_row: Option<u32>,
    pub rows_per_image: Option<u32>,
}

/// A buffer used as the source or destination of a texture copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexelCopyBufferInfo {
    pub layout: TexelCopyBufferLayout,
    pub buffer: id::BufferId,
}

/// A region of one mip level of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexelCopyTextureInfo {
    pub texture: id::TextureId,
    pub mip_level: u32,
    pub origin: Origin3d,
    pub aspect: TextureAspect,
}

impl TexelCopyTextureInfo {
    pub fn new(texture: id::TextureId) -> Self {
        Self {
            texture,
            mip_level: 0,
            origin: Origin3d::default(),
            aspect: TextureAspect::All,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopySide {
    Source,
    Destination,
}

/// Error encountered while validating a copy or write.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransferError {
    #[error("Copy size {0} does not respect `COPY_BUFFER_ALIGNMENT`")]
    UnalignedCopySize(BufferAddress),
    #[error("Copy offset {0} does not respect `COPY_BUFFER_ALIGNMENT`")]
    UnalignedBufferOffset(BufferAddress),
    #[error("Copy of {start_offset}..{end_offset} would end up overrunning the bounds of the {side:?} buffer of size {buffer_size}")]
    BufferOverrun {
        start_offset: BufferAddress,
        end_offset: BufferAddress,
        buffer_size: BufferAddress,
        side: CopySide,
    },
    #[error("Copy of {dimension} {start}..{end} would end up overrunning the bounds of the {side:?} texture of {dimension} size {texture_size}")]
    TextureOverrun {
        start: u32,
        end: u32,
        texture_size: u32,
        dimension: &'static str,
        side: CopySide,
    },
    #[error("Source and destination cannot be the same buffer")]
    SameSourceDestinationBuffer,
    #[error("Buffer lacks the usage {0:?}")]
    MissingBufferUsage(BufferUsages),
    #[error("Texture lacks the usage {0:?}")]
    MissingTextureUsage(TextureUsages),
    #[error("Mip level {requested} is out of range of {count} levels")]
    InvalidMipLevel { requested: u32, count: u32 },
    #[error("Aspect {aspect:?} of format {format:?} can't be copied")]
    CopyUnsupportedAspect {
        format: TextureFormat,
        aspect: TextureAspect,
    },
    #[error("Copy origin {origin:?} and size {size:?} must be aligned to the block size of {format:?}")]
    UnalignedBlock {
        origin: Origin3d,
        size: Extent3d,
        format: TextureFormat,
    },
    #[error("Depth, stencil and multisampled textures must be copied as a whole subresource")]
    InvalidDepthTextureExtent,
    #[error("Bytes per row does not respect `COPY_BYTES_PER_ROW_ALIGNMENT`")]
    UnalignedBytesPerRow,
    #[error("Buffer offset {0} is not aligned to the block copy size")]
    UnalignedLayoutOffset(BufferAddress),
    #[error("Bytes per row is required when copying more than one row")]
    UnspecifiedBytesPerRow,
    #[error("Rows per image is required when copying more than one image")]
    UnspecifiedRowsPerImage,
    #[error("Bytes per row {0} is smaller than a row of the copy")]
    InvalidBytesPerRow(u32),
    #[error("Rows per image {0} is smaller than the copy height")]
    InvalidRowsPerImage(u32),
    #[error("Copy would read {required} bytes from a source of {size} bytes")]
    DataOverrun { required: u64, size: u64 },
    #[error("Formats {src:?} and {dst:?} are not copy compatible")]
    MismatchedFormats { src: TextureFormat, dst: TextureFormat },
    #[error("Sample counts {src} and {dst} differ")]
    MismatchedSampleCounts { src: u32, dst: u32 },
    #[error("Format {0:?} is not supported as a copy for browser destination")]
    InvalidBrowserCopyFormat(TextureFormat),
}

/// Size in bytes of one texel block of `aspect` of `format`, if that aspect
/// can be copied on its own.
pub(crate) fn aspect_copy_size(format: TextureFormat, aspect: TextureAspect) -> Option<u32> {
    match (format, aspect) {
        (TextureFormat::Stencil8, TextureAspect::All | TextureAspect::StencilOnly) => Some(1),
        (
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32FloatStencil8,
            TextureAspect::StencilOnly,
        ) => Some(1),
        (TextureFormat::Depth16Unorm, TextureAspect::All | TextureAspect::DepthOnly) => Some(2),
        (TextureFormat::Depth32Float, TextureAspect::All | TextureAspect::DepthOnly)
        | (TextureFormat::Depth32FloatStencil8, TextureAspect::DepthOnly) => Some(4),
        (_, TextureAspect::All) => format.block_copy_size(),
        _ => None,
    }
}

pub(crate) fn check_texture_usage(texture: &Texture, expected: TextureUsages) -> Result<(), TransferError> {
    if texture.usage.contains(expected) {
        Ok(())
    } else {
        Err(TransferError::MissingTextureUsage(expected))
    }
}

pub(crate) fn check_buffer_usage(buffer: &Buffer, expected: BufferUsages) -> Result<(), TransferError> {
    if buffer.usage.contains(expected) {
        Ok(())
    } else {
        Err(TransferError::MissingBufferUsage(expected))
    }
}

/// Validate that `offset..offset + size` lies within `buffer`.
pub(crate) fn validate_buffer_range(
    buffer: &Buffer,
    offset: BufferAddress,
    size: BufferAddress,
    side: CopySide,
) -> Result<(), TransferError> {
    let end_offset = offset.checked_add(size).unwrap_or(u64::MAX);

    if end_offset > buffer.size {
        return Err(TransferError::BufferOverrun {
            start_offset: offset,
            end_offset,
            buffer_size: buffer.size,
            side,
        });
    }

    Ok(())
}

/// Validate that `size` at `copy.origin` fits in `copy.mip_level` of
/// `texture`.
pub(crate) fn validate_texture_copy_range(
    copy: &TexelCopyTextureInfo,
    texture: &Texture,
    side: CopySide,
    size: &Extent3d,
) -> Result<(), TransferError> {
    if copy.mip_level >= texture.mip_level_count {
        return Err(TransferError::InvalidMipLevel {
            requested: copy.mip_level,
            count: texture.mip_level_count,
        });
    }

    let extent = texture.mip_level_size(copy.mip_level);

    let check = |start: u32, length: u32, texture_size: u32, dimension| {
        let end = start.saturating_add(length);

        if end > texture_size {
            Err(TransferError::TextureOverrun {
                start,
                end,
                texture_size,
                dimension,
                side,
            })
        } else {
            Ok(())
        }
    };

    check(copy.origin.x, size.width, extent.width, "X")?;
    check(copy.origin.y, size.height, extent.height, "Y")?;
    check(
        copy.origin.z,
        size.depth_or_array_layers,
        extent.depth_or_array_layers,
        match texture.dimension {
            TextureDimension::D3 => "Z",
            _ => "array layer",
        },
    )?;

    let (block_width, block_height) = texture.format.block_dimensions();

    if copy.origin.x % block_width != 0
        || copy.origin.y % block_height != 0
        || size.width % block_width != 0
        || size.height % block_height != 0
    {
        return Err(TransferError::UnalignedBlock {
            origin: copy.origin,
            size: *size,
            format: texture.format,
        });
    }

    if texture.format.is_depth_stencil() || texture.sample_count > 1 {
        let whole = copy.origin.x == 0
            && copy.origin.y == 0
            && size.width == extent.width
            && size.height == extent.height;

        if !whole {
            return Err(TransferError::InvalidDepthTextureExtent);
        }
    }

    if aspect_copy_size(texture.format, copy.aspect).is_none() {
        return Err(TransferError::CopyUnsupportedAspect {
            format: texture.format,
            aspect: copy.aspect,
        });
    }

    Ok(())
}

/// Validate the layout of linear texel data of `data_size` bytes for a copy
/// of `size` texels, returning the number of bytes the copy reads or writes.
///
/// Copies through a buffer additionally need `bytes_per_row` to be aligned
/// to [`COPY_BYTES_PER_ROW_ALIGNMENT`].
pub(crate) fn validate_linear_texture_data(
    layout: &TexelCopyBufferLayout,
    format: TextureFormat,
    aspect: TextureAspect,
    data_size: u64,
    size: &Extent3d,
    through_buffer: bool,
) -> Result<u64, TransferError> {
    let block_size = aspect_copy_size(format, aspect)
        .ok_or(TransferError::CopyUnsupportedAspect { format, aspect })?;

    let (block_width, block_height) = format.block_dimensions();
    let width_blocks = size.width / block_width;
    let height_blocks = size.height / block_height;
    let bytes_in_last_row = width_blocks as u64 * block_size as u64;

    if through_buffer {
        if layout.offset % block_size as u64 != 0 {
            return Err(TransferError::UnalignedLayoutOffset(layout.offset));
        }

        if let Some(bytes_per_row) = layout.bytes_per_row {
            if bytes_per_row % COPY_BYTES_PER_ROW_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedBytesPerRow);
            }
        }
    }

    let bytes_per_row = match layout.bytes_per_row {
        Some(bytes_per_row) if (bytes_per_row as u64) < bytes_in_last_row => {
            return Err(TransferError::InvalidBytesPerRow(bytes_per_row))
        }
        Some(bytes_per_row) => bytes_per_row as u64,
        None if height_blocks > 1 || size.depth_or_array_layers > 1 => {
            return Err(TransferError::UnspecifiedBytesPerRow)
        }
        None => bytes_in_last_row,
    };

    let rows_per_image = match layout.rows_per_image {
        Some(rows) if rows < height_blocks => return Err(TransferError::InvalidRowsPerImage(rows)),
        Some(rows) => rows as u64,
        None if size.depth_or_array_layers > 1 => {
            return Err(TransferError::UnspecifiedRowsPerImage)
        }
        None => height_blocks as u64,
    };

    let required = if width_blocks == 0 || height_blocks == 0 || size.depth_or_array_layers == 0 {
        Some(0)
    } else {
        bytes_per_row
            .checked_mul(rows_per_image)
            .and_then(|bytes_per_image| {
                bytes_per_image.checked_mul(size.depth_or_array_layers as u64 - 1)
            })
            .and_then(|images| {
                let rows = bytes_per_row.checked_mul(height_blocks as u64 - 1)?;
                images.checked_add(rows)?.checked_add(bytes_in_last_row)
            })
    };

    let end = required.and_then(|required| layout.offset.checked_add(required));

    match (required, end) {
        (Some(required), Some(end)) if end <= data_size => Ok(required),
        (_, end) => Err(TransferError::DataOverrun {
            required: end.unwrap_or(u64::MAX),
            size: data_size,
        }),
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClearError {
    #[error("Buffer lacks the usage COPY_DST")]
    MissingCopyDstUsage,
    #[error("Clear offset {0} is not a multiple of `COPY_BUFFER_ALIGNMENT`")]
    UnalignedOffset(BufferAddress),
    #[error("Clear size {0} is not a multiple of `COPY_BUFFER_ALIGNMENT`")]
    UnalignedSize(BufferAddress),
    #[error("Clear of {start_offset}..{end_offset} would end up overrunning the bounds of the buffer of size {buffer_size}")]
    BufferOverrun {
        start_offset: BufferAddress,
        end_offset: BufferAddress,
        buffer_size: BufferAddress,
    },
}

/// Resolve the two sides of a texture copy.
fn resolve_texture(
    hub: &Hub,
    encoder: &CommandEncoder,
    copy: &TexelCopyTextureInfo,
) -> Result<Arc<Texture>, CommandEncoderError> {
    Ok(resolve(&hub.textures, copy.texture, &encoder.device)?)
}

fn resolve_buffer(
    hub: &Hub,
    encoder: &CommandEncoder,
    buffer: id::BufferId,
) -> Result<Arc<Buffer>, CommandEncoderError> {
    Ok(resolve(&hub.buffers, buffer, &encoder.device)?)
}

fn copy_compatible(src: TextureFormat, dst: TextureFormat) -> bool {
    src == dst || srgb_counterpart(src) == Some(dst)
}

impl Global {
    /// Zero `size` bytes of `buffer_id` from `offset`, or the rest of the
    /// buffer when `size` is `None`.
    pub fn command_encoder_clear_buffer(
        &self,
        encoder_id: id::CommandEncoderId,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        size: Option<BufferAddress>,
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::clear_buffer");
        api_log!("CommandEncoder::clear_buffer {encoder_id:?} {buffer_id:?} {offset} {size:?}");

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let buffer = resolve_buffer(&self.hub, &encoder, buffer_id)?;

            if !buffer.usage.contains(BufferUsages::COPY_DST) {
                return Err(ClearError::MissingCopyDstUsage.into());
            }

            if offset % COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ClearError::UnalignedOffset(offset).into());
            }

            let size = size.unwrap_or_else(|| buffer.size.saturating_sub(offset));

            if size % COPY_BUFFER_ALIGNMENT != 0 {
                return Err(ClearError::UnalignedSize(size).into());
            }

            let end_offset = offset.saturating_add(size);

            if end_offset > buffer.size {
                return Err(ClearError::BufferOverrun {
                    start_offset: offset,
                    end_offset,
                    buffer_size: buffer.size,
                }
                .into());
            }

            recording.used.add_buffer(&buffer);
            Ok(())
        });

        Ok(())
    }

    pub fn command_encoder_copy_buffer_to_buffer(
        &self,
        encoder_id: id::CommandEncoderId,
        source: id::BufferId,
        source_offset: BufferAddress,
        destination: id::BufferId,
        destination_offset: BufferAddress,
        size: BufferAddress,
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::copy_buffer_to_buffer");
        api_log!(
            "CommandEncoder::copy_buffer_to_buffer {encoder_id:?} {source:?} {source_offset} {destination:?} {destination_offset} {size}"
        );

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            if source == destination {
                return Err(TransferError::SameSourceDestinationBuffer.into());
            }

            let src = resolve_buffer(&self.hub, &encoder, source)?;
            let dst = resolve_buffer(&self.hub, &encoder, destination)?;

            check_buffer_usage(&src, BufferUsages::COPY_SRC)?;
            check_buffer_usage(&dst, BufferUsages::COPY_DST)?;

            if size % COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedCopySize(size).into());
            }

            for offset in [source_offset, destination_offset] {
                if offset % COPY_BUFFER_ALIGNMENT != 0 {
                    return Err(TransferError::UnalignedBufferOffset(offset).into());
                }
            }

            validate_buffer_range(&src, source_offset, size, CopySide::Source)?;
            validate_buffer_range(&dst, destination_offset, size, CopySide::Destination)?;

            recording.used.add_buffer(&src);
            recording.used.add_buffer(&dst);
            Ok(())
        });

        Ok(())
    }

    pub fn command_encoder_copy_buffer_to_texture(
        &self,
        encoder_id: id::CommandEncoderId,
        source: &TexelCopyBufferInfo,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::copy_buffer_to_texture");
        api_log!(
            "CommandEncoder::copy_buffer_to_texture {encoder_id:?} {:?} -> {:?} {copy_size:?}",
            source.buffer,
            destination.texture
        );

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let src = resolve_buffer(&self.hub, &encoder, source.buffer)?;
            let dst = resolve_texture(&self.hub, &encoder, destination)?;

            check_buffer_usage(&src, BufferUsages::COPY_SRC)?;
            check_texture_usage(&dst, TextureUsages::COPY_DST)?;
            validate_texture_copy_range(destination, &dst, CopySide::Destination, copy_size)?;
            validate_linear_texture_data(
                &source.layout,
                dst.format,
                destination.aspect,
                src.size,
                copy_size,
                true,
            )?;

            recording.used.add_buffer(&src);
            recording.used.add_texture(&dst);
            Ok(())
        });

        Ok(())
    }

    pub fn command_encoder_copy_texture_to_buffer(
        &self,
        encoder_id: id::CommandEncoderId,
        source: &TexelCopyTextureInfo,
        destination: &TexelCopyBufferInfo,
        copy_size: &Extent3d,
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::copy_texture_to_buffer");
        api_log!(
            "CommandEncoder::copy_texture_to_buffer {encoder_id:?} {:?} -> {:?} {copy_size:?}",
            source.texture,
            destination.buffer
        );

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let src = resolve_texture(&self.hub, &encoder, source)?;
            let dst = resolve_buffer(&self.hub, &encoder, destination.buffer)?;

            check_texture_usage(&src, TextureUsages::COPY_SRC)?;
            check_buffer_usage(&dst, BufferUsages::COPY_DST)?;

            if src.sample_count > 1 {
                return Err(TransferError::MismatchedSampleCounts {
                    src: src.sample_count,
                    dst: 1,
                }
                .into());
            }

            validate_texture_copy_range(source, &src, CopySide::Source, copy_size)?;
            validate_linear_texture_data(
                &destination.layout,
                src.format,
                source.aspect,
                dst.size,
                copy_size,
                true,
            )?;

            recording.used.add_texture(&src);
            recording.used.add_buffer(&dst);
            Ok(())
        });

        Ok(())
    }

    pub fn command_encoder_copy_texture_to_texture(
        &self,
        encoder_id: id::CommandEncoderId,
        source: &TexelCopyTextureInfo,
        destination: &TexelCopyTextureInfo,
        copy_size: &Extent3d,
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::copy_texture_to_texture");
        api_log!(
            "CommandEncoder::copy_texture_to_texture {encoder_id:?} {:?} -> {:?} {copy_size:?}",
            source.texture,
            destination.texture
        );

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let src = resolve_texture(&self.hub, &encoder, source)?;
            let dst = resolve_texture(&self.hub, &encoder, destination)?;

            check_texture_usage(&src, TextureUsages::COPY_SRC)?;
            check_texture_usage(&dst, TextureUsages::COPY_DST)?;

            if !copy_compatible(src.format, dst.format) {
                return Err(TransferError::MismatchedFormats {
                    src: src.format,
                    dst: dst.format,
                }
                .into());
            }

            if src.sample_count != dst.sample_count {
                return Err(TransferError::MismatchedSampleCounts {
                    src: src.sample_count,
                    dst: dst.sample_count,
                }
                .into());
            }

            validate_texture_copy_range(source, &src, CopySide::Source, copy_size)?;
            validate_texture_copy_range(destination, &dst, CopySide::Destination, copy_size)?;

            recording.used.add_texture(&src);
            recording.used.add_texture(&dst);
            Ok(())
        });

        Ok(())
    }

    /// Record a write of `data` into `buffer_id` at `offset`.
    pub fn command_encoder_write_buffer(
        &self,
        encoder_id: id::CommandEncoderId,
        buffer_id: id::BufferId,
        offset: BufferAddress,
        data: &[u8],
    ) -> Result<(), InvalidId> {
        profiling::scope!("CommandEncoder::write_buffer");
        api_log!("CommandEncoder::write_buffer {encoder_id:?} {buffer_id:?} {offset} len {}", data.len());

        let encoder = self.hub.command_encoders.get(encoder_id)?;

        encoder.record(|recording| {
            let buffer = resolve_buffer(&self.hub, &encoder, buffer_id)?;
            let size = data.len() as BufferAddress;

            check_buffer_usage(&buffer, BufferUsages::COPY_DST)?;

            if offset % COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedBufferOffset(offset).into());
            }

            if size % COPY_BUFFER_ALIGNMENT != 0 {
                return Err(TransferError::UnalignedCopySize(size).into());
            }

            validate_buffer_range(&buffer, offset, size, CopySide::Destination)?;
            recording.used.add_buffer(&buffer);
            Ok(())
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32, depth_or_array_layers: u32) -> Extent3d {
        Extent3d {
            width,
            height,
            depth_or_array_layers,
        }
    }

    #[test]
    fn single_row_needs_no_layout() {
        let layout = TexelCopyBufferLayout::default();
        let required = validate_linear_texture_data(
            &layout,
            TextureFormat::Rgba8Unorm,
            TextureAspect::All,
            64,
            &extent(16, 1, 1),
            false,
        );
        assert_eq!(required, Ok(64));
    }

    #[test]
    fn multiple_rows_need_bytes_per_row() {
        let mut layout = TexelCopyBufferLayout::default();
        let size = extent(4, 4, 1);

        assert_eq!(
            validate_linear_texture_data(&layout, TextureFormat::R8Unorm, TextureAspect::All, 1024, &size, false),
            Err(TransferError::UnspecifiedBytesPerRow)
        );

        layout.bytes_per_row = Some(100);
        assert_eq!(
            validate_linear_texture_data(&layout, TextureFormat::R8Unorm, TextureAspect::All, 1024, &size, false),
            Ok(304)
        );
        assert_eq!(
            validate_linear_texture_data(&layout, TextureFormat::R8Unorm, TextureAspect::All, 1024, &size, true),
            Err(TransferError::UnalignedBytesPerRow)
        );
        assert_eq!(
            validate_linear_texture_data(&layout, TextureFormat::R8Unorm, TextureAspect::All, 300, &size, false),
            Err(TransferError::DataOverrun {
                required: 304,
                size: 300
            })
        );
    }

    #[test]
    fn overflowing_layout_is_an_overrun() {
        let layout = TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(0xFFFF_FF00),
            rows_per_image: Some(u32::MAX),
        };

        assert_eq!(
            validate_linear_texture_data(
                &layout,
                TextureFormat::Rgba8Unorm,
                TextureAspect::All,
                1024,
                &extent(1, 1, 3),
                false
            ),
            Err(TransferError::DataOverrun {
                required: u64::MAX,
                size: 1024
            })
        );

        let layout = TexelCopyBufferLayout {
            offset: u64::MAX - 2,
            bytes_per_row: None,
            rows_per_image: None,
        };

        assert!(matches!(
            validate_linear_texture_data(
                &layout,
                TextureFormat::Rgba8Unorm,
                TextureAspect::All,
                1024,
                &extent(1, 1, 1),
                false
            ),
            Err(TransferError::DataOverrun { .. })
        ));
    }

    #[test]
    fn depth_aspects() {
        assert_eq!(
            aspect_copy_size(TextureFormat::Depth24PlusStencil8, TextureAspect::StencilOnly),
            Some(1)
        );
        assert_eq!(
            aspect_copy_size(TextureFormat::Depth24PlusStencil8, TextureAspect::DepthOnly),
            None
        );
        assert_eq!(aspect_copy_size(TextureFormat::Depth16Unorm, TextureAspect::All), Some(2));
    }

    #[test]
    fn srgb_copies_are_compatible() {
        assert!(copy_compatible(TextureFormat::Rgba8Unorm, TextureFormat::Rgba8UnormSrgb));
        assert!(!copy_compatible(TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm));
    }
}
