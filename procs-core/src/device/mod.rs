use arrayvec::ArrayVec;
use pt::{
    DeviceLostReason, ErrorType, FeatureName, Limits, LoggingType, PopErrorScopeStatus,
    TextureFormat,
};
use thiserror::Error;

use crate::{event::CallbackInfo, Label};

pub mod global;
pub mod queue;
pub mod resource;

pub use resource::Device;

/// Largest number of color attachments of a render pass.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;
/// Largest number of bind groups of a pipeline layout.
pub const MAX_BIND_GROUPS: usize = 8;
/// Largest number of vertex buffers of a render pipeline.
pub const MAX_VERTEX_BUFFERS: usize = 16;

pub type DeviceLostCallback = Box<dyn FnOnce(DeviceLostReason, &str) + Send>;
pub type DeviceLostCallbackInfo = CallbackInfo<DeviceLostCallback>;

/// Receives errors that no error scope captured.
pub type UncapturedErrorCallback = Box<dyn Fn(ErrorType, &str) + Send + Sync>;

pub type LoggingCallback = Box<dyn Fn(LoggingType, &str) + Send + Sync>;

pub type PopErrorScopeCallback = Box<dyn FnOnce(PopErrorScopeStatus, ErrorType, &str) + Send>;
pub type PopErrorScopeCallbackInfo = CallbackInfo<PopErrorScopeCallback>;

/// Describes a [`Device`].
///
/// The descriptor is taken by value since it owns the device's callbacks.
#[derive(Default)]
pub struct DeviceDescriptor<'a> {
    pub label: Label<'a>,
    pub required_features: Vec<FeatureName>,
    /// Limits to enable, or the default limits when `None`.
    pub required_limits: Option<Limits>,
    pub default_queue_label: Label<'a>,
    pub device_lost_callback_info: Option<DeviceLostCallbackInfo>,
    pub uncaptured_error_callback: Option<UncapturedErrorCallback>,
}

impl std::fmt::Debug for DeviceDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("label", &self.label)
            .field("required_features", &self.required_features)
            .field("required_limits", &self.required_limits)
            .field("default_queue_label", &self.default_queue_label)
            .finish_non_exhaustive()
    }
}

/// Properties of an Android hardware buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AHardwareBufferProperties {
    pub external_format: u64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceError {
    #[error(transparent)]
    Invalid(#[from] crate::InvalidId),
    #[error("Parent device is lost")]
    Lost,
    #[error("AHardwareBuffer is not supported by the backend")]
    AHardwareBufferUnsupported,
    #[error("Error type {0:?} can't be injected")]
    InvalidErrorType(ErrorType),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PopErrorScopeError {
    #[error("No error scopes to pop")]
    Empty,
}

/// Formats a render pass, bundle or pipeline renders into.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub(crate) struct RenderPassContext {
    pub colors: ArrayVec<Option<TextureFormat>, MAX_COLOR_ATTACHMENTS>,
    pub depth_stencil: Option<TextureFormat>,
    pub sample_count: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderPassCompatibilityError {
    #[error("Incompatible color attachments: expected {expected:?}, got {actual:?}")]
    IncompatibleColorAttachment {
        expected: Vec<Option<TextureFormat>>,
        actual: Vec<Option<TextureFormat>>,
    },
    #[error("Incompatible depth-stencil attachment: expected {expected:?}, got {actual:?}")]
    IncompatibleDepthStencilAttachment {
        expected: Option<TextureFormat>,
        actual: Option<TextureFormat>,
    },
    #[error("Incompatible sample count: expected {expected}, got {actual}")]
    IncompatibleSampleCount { expected: u32, actual: u32 },
}

impl RenderPassContext {
    // Trailing `None` color targets are insignificant.
    fn trimmed_colors(&self) -> &[Option<TextureFormat>] {
        let len = self
            .colors
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |index| index + 1);
        &self.colors[..len]
    }

    pub(crate) fn check_compatible(&self, other: &Self) -> Result<(), RenderPassCompatibilityError> {
        if self.trimmed_colors() != other.trimmed_colors() {
            return Err(RenderPassCompatibilityError::IncompatibleColorAttachment {
                expected: self.trimmed_colors().to_vec(),
                actual: other.trimmed_colors().to_vec(),
            });
        }

        if self.depth_stencil != other.depth_stencil {
            return Err(RenderPassCompatibilityError::IncompatibleDepthStencilAttachment {
                expected: self.depth_stencil,
                actual: other.depth_stencil,
            });
        }

        if self.sample_count != other.sample_count {
            return Err(RenderPassCompatibilityError::IncompatibleSampleCount {
                expected: self.sample_count,
                actual: other.sample_count,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_empty_colors_are_compatible() {
        let mut a = RenderPassContext {
            sample_count: 1,
            ..Default::default()
        };
        a.colors.push(Some(TextureFormat::Rgba8Unorm));

        let mut b = a.clone();
        b.colors.push(None);
        assert_eq!(a.check_compatible(&b), Ok(()));

        b.sample_count = 4;
        assert!(matches!(
            a.check_compatible(&b),
            Err(RenderPassCompatibilityError::IncompatibleSampleCount { .. })
        ));
    }
}
