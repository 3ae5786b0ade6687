use std::sync::Arc;

use thiserror::Error;

use crate::{
    binding_model::{BindError, BindGroup, BindGroupLayout},
    device::{Device, MAX_BIND_GROUPS},
    resource::Resource,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BinderError {
    #[error("Bind group at index {0} is required by the pipeline but not set")]
    MissingBindGroup(u32),
    #[error("Bind group at index {0} is incompatible with the pipeline's bind group layout")]
    IncompatibleBindGroup(u32),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ImmediatesError {
    #[error("Immediate data offset {offset} and size {size} must be multiples of 4")]
    Unaligned { offset: u32, size: usize },
    #[error("Immediate data range ends at {end}, which exceeds the limit of {limit}")]
    OutOfBounds { end: u64, limit: u32 },
}

/// Bind groups currently set on a pass or bundle.
#[derive(Debug, Default)]
pub(crate) struct Binder {
    groups: [Option<Arc<BindGroup>>; MAX_BIND_GROUPS],
}

impl Binder {
    /// Set or clear the group at `index`.
    pub(crate) fn assign(
        &mut self,
        device: &Device,
        index: u32,
        group: Option<Arc<BindGroup>>,
        offsets: &[u32],
    ) -> Result<(), BindError> {
        let max = device.limits.max_bind_groups.min(MAX_BIND_GROUPS as u32);

        if index >= max {
            return Err(BindError::InvalidGroupIndex { index, max });
        }

        match &group {
            Some(group) => group.validate_dynamic_offsets(offsets)?,
            None if !offsets.is_empty() => {
                return Err(BindError::MismatchedDynamicOffsetCount {
                    expected: 0,
                    actual: offsets.len(),
                })
            }
            None => {}
        }

        self.groups[index as usize] = group;
        Ok(())
    }

    /// Check that every non-empty group of `layouts` has a compatible bind
    /// group set.
    pub(crate) fn check_compatible(&self, layouts: &[Arc<BindGroupLayout>]) -> Result<(), BinderError> {
        for (index, layout) in layouts.iter().enumerate() {
            if layout.entries.is_empty() && !layout.is_error() {
                continue;
            }

            let index_u32 = index as u32;

            match self.groups.get(index).and_then(Option::as_ref) {
                None => return Err(BinderError::MissingBindGroup(index_u32)),
                Some(group) if !group.layout.is_compatible(layout) => {
                    return Err(BinderError::IncompatibleBindGroup(index_u32))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.groups = Default::default();
    }
}

/// Validate an immediate data upload of `size` bytes at `offset`.
pub(crate) fn validate_immediates(device: &Device, offset: u32, size: usize) -> Result<(), ImmediatesError> {
    if offset % 4 != 0 || size % 4 != 0 {
        return Err(ImmediatesError::Unaligned { offset, size });
    }

    let end = offset as u64 + size as u64;
    let limit = device.limits.max_immediate_size;

    if end > limit as u64 {
        return Err(ImmediatesError::OutOfBounds { end, limit });
    }

    Ok(())
}
