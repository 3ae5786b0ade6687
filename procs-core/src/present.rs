/*! Presentation.

## Lifecycle

A surface starts out unconfigured. `surface_configure` binds it to a device
and a texture description. `surface_get_current_texture` then acquires a
texture matching the configuration, and `surface_present` hands it back,
destroying it. Acquiring again before presenting returns the same texture.
Reconfiguring or unconfiguring destroys a texture that was acquired but never
presented.
!*/

use std::sync::Arc;

use parking_lot::Mutex;
use pt::{
    CompositeAlphaMode, PresentMode, SurfaceCapabilities, SurfaceGetCurrentTextureStatus,
    TextureFormat, TextureUsages,
};
use thiserror::Error;

use crate::{
    api_log,
    device::Device,
    error::ObjectError,
    global::Global,
    id,
    instance::Instance,
    resource::{srgb_counterpart, Resource, ResourceInfo, Texture, TextureDescriptor},
    resource_log,
    storage::InvalidId,
    Label, LabelHelpers,
};

/// The native window system object a surface presents to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceSource {
    AndroidNativeWindow { window: usize },
    MetalLayer { layer: usize },
    WaylandSurface { display: usize, surface: usize },
    WindowsHwnd { hinstance: usize, hwnd: usize },
    XlibWindow { display: usize, window: u64 },
    /// Not attached to any window; presenting only recycles the texture.
    #[default]
    Headless,
}

/// Describes a [`Surface`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceDescriptor<'a> {
    pub label: Label<'a>,
    pub source: SurfaceSource,
}

/// Describes how a [`Surface`] is configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceConfiguration {
    pub device: id::DeviceId,
    pub format: TextureFormat,
    pub usage: TextureUsages,
    pub width: u32,
    pub height: u32,
    pub view_formats: Vec<TextureFormat>,
    pub alpha_mode: CompositeAlphaMode,
    pub present_mode: PresentMode,
}

impl SurfaceConfiguration {
    pub fn new(device: id::DeviceId, format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            device,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT,
            width,
            height,
            view_formats: Vec::new(),
            alpha_mode: CompositeAlphaMode::Auto,
            present_mode: PresentMode::Fifo,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceError {
    #[error(transparent)]
    Invalid(#[from] InvalidId),
    #[error("Surface is not configured for presentation")]
    NotConfigured,
    #[error("No surface texture was acquired")]
    NothingToPresent,
    #[error("Device is lost")]
    DeviceLost,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigureSurfaceError {
    #[error(transparent)]
    Invalid(#[from] InvalidId),
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error("Device is lost")]
    DeviceLost,
    #[error("Both `Surface` width and height must be non-zero. Wait to recreate the `Surface` until the window has non-zero area.")]
    ZeroArea,
    #[error("`Surface` width and height must be within the maximum supported texture size. Requested was ({width}, {height}), maximum extent is {max_texture_dimension_2d}.")]
    TooLarge {
        width: u32,
        height: u32,
        max_texture_dimension_2d: u32,
    },
    #[error("Requested format {requested:?} is not in list of supported formats: {available:?}")]
    UnsupportedFormat {
        requested: TextureFormat,
        available: Vec<TextureFormat>,
    },
    #[error("Requested present mode {requested:?} is not in the list of supported present modes: {available:?}")]
    UnsupportedPresentMode {
        requested: PresentMode,
        available: Vec<PresentMode>,
    },
    #[error("Requested alpha mode {requested:?} is not in the list of supported alpha modes: {available:?}")]
    UnsupportedAlphaMode {
        requested: CompositeAlphaMode,
        available: Vec<CompositeAlphaMode>,
    },
    #[error("Requested usage {requested:?} is not in the list of supported usages: {available:?}")]
    UnsupportedUsage {
        requested: TextureUsages,
        available: TextureUsages,
    },
    #[error("View format {view:?} is not compatible with the surface format {format:?}")]
    InvalidViewFormat {
        view: TextureFormat,
        format: TextureFormat,
    },
}

/// Result of `surface_get_current_texture`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceOutput {
    pub status: SurfaceGetCurrentTextureStatus,
    /// A new reference to the acquired texture.
    pub texture: Option<id::TextureId>,
}

#[derive(Debug)]
struct Presentation {
    device: Arc<Device>,
    config: SurfaceConfiguration,
    acquired: Option<Arc<Texture>>,
}

#[derive(Debug)]
pub struct Surface {
    pub(crate) info: ResourceInfo,
    pub(crate) instance: Arc<Instance>,
    pub(crate) source: SurfaceSource,
    presentation: Mutex<Option<Presentation>>,
}

impl Resource for Surface {
    type Marker = id::markers::Surface;
    const TYPE: &'static str = "Surface";

    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn on_release(&self, _hub: &crate::hub::Hub) {
        self.unconfigure();
    }
}

impl Surface {
    fn new(instance: &Arc<Instance>, desc: &SurfaceDescriptor) -> Self {
        Self {
            info: ResourceInfo::new(desc.label.borrow_option(), false),
            instance: instance.clone(),
            source: desc.source,
            presentation: Mutex::new(None),
        }
    }

    fn unconfigure(&self) {
        if let Some(presentation) = self.presentation.lock().take() {
            if let Some(texture) = presentation.acquired {
                texture.destroy();
            }
        }
    }
}

fn validate_surface_configuration(
    config: &SurfaceConfiguration,
    caps: &SurfaceCapabilities,
    max_texture_dimension_2d: u32,
) -> Result<(), ConfigureSurfaceError> {
    if config.width == 0 || config.height == 0 {
        return Err(ConfigureSurfaceError::ZeroArea);
    }

    if config.width > max_texture_dimension_2d || config.height > max_texture_dimension_2d {
        return Err(ConfigureSurfaceError::TooLarge {
            width: config.width,
            height: config.height,
            max_texture_dimension_2d,
        });
    }

    if !caps.formats.contains(&config.format) {
        return Err(ConfigureSurfaceError::UnsupportedFormat {
            requested: config.format,
            available: caps.formats.clone(),
        });
    }

    for &view in &config.view_formats {
        if view != config.format && srgb_counterpart(config.format) != Some(view) {
            return Err(ConfigureSurfaceError::InvalidViewFormat {
                view,
                format: config.format,
            });
        }
    }

    if !caps.present_modes.contains(&config.present_mode) {
        return Err(ConfigureSurfaceError::UnsupportedPresentMode {
            requested: config.present_mode,
            available: caps.present_modes.clone(),
        });
    }

    if config.alpha_mode != CompositeAlphaMode::Auto && !caps.alpha_modes.contains(&config.alpha_mode) {
        return Err(ConfigureSurfaceError::UnsupportedAlphaMode {
            requested: config.alpha_mode,
            available: caps.alpha_modes.clone(),
        });
    }

    if config.usage.is_empty() || !caps.usages.contains(config.usage) {
        return Err(ConfigureSurfaceError::UnsupportedUsage {
            requested: config.usage,
            available: caps.usages,
        });
    }

    Ok(())
}

impl Global {
    pub fn instance_create_surface(
        &self,
        instance_id: id::InstanceId,
        desc: &SurfaceDescriptor,
    ) -> Result<id::SurfaceId, InvalidId> {
        profiling::scope!("Instance::create_surface");
        api_log!("Instance::create_surface {instance_id:?} {:?}", desc.source);

        let instance = self.hub.instances.get(instance_id)?;
        let (id, _) = self.hub.surfaces.register(Surface::new(&instance, desc));
        Ok(id)
    }

    /// Configure the surface, replacing any previous configuration.
    pub fn surface_configure(
        &self,
        surface_id: id::SurfaceId,
        config: &SurfaceConfiguration,
    ) -> Result<(), ConfigureSurfaceError> {
        profiling::scope!("Surface::configure");
        api_log!("Surface::configure {surface_id:?} {config:?}");

        let surface = self.hub.surfaces.get(surface_id)?;
        let device = self.hub.devices.get(config.device)?;

        let result = (|| {
            if device.is_error() {
                return Err(ObjectError::ErrorObject(Device::TYPE, device.label()).into());
            }

            if device.is_lost() {
                return Err(ConfigureSurfaceError::DeviceLost);
            }

            validate_surface_configuration(
                config,
                &device.adapter.desc.surface_capabilities,
                device.limits.max_texture_dimension_2d,
            )
        })();

        if let Err(err) = result {
            device.validation_error(err.clone());
            return Err(err);
        }

        surface.unconfigure();
        *surface.presentation.lock() = Some(Presentation {
            device,
            config: config.clone(),
            acquired: None,
        });

        Ok(())
    }

    pub fn surface_get_capabilities(
        &self,
        surface_id: id::SurfaceId,
        adapter_id: id::AdapterId,
    ) -> Result<SurfaceCapabilities, InvalidId> {
        let surface = self.hub.surfaces.get(surface_id)?;
        let adapter = self.hub.adapters.get(adapter_id)?;

        if !Arc::ptr_eq(&surface.instance, &adapter.instance) {
            log::warn!("Surface {:?} and the adapter come from different instances", surface.label());
            return Ok(SurfaceCapabilities::default());
        }

        Ok(adapter.desc.surface_capabilities.clone())
    }

    /// Acquire the texture to render the next frame into.
    pub fn surface_get_current_texture(&self, surface_id: id::SurfaceId) -> Result<SurfaceOutput, InvalidId> {
        profiling::scope!("Surface::get_current_texture");
        api_log!("Surface::get_current_texture {surface_id:?}");

        let surface = self.hub.surfaces.get(surface_id)?;
        let mut presentation = surface.presentation.lock();

        let presentation = match presentation.as_mut() {
            Some(presentation) => presentation,
            None => {
                log::warn!("Surface {:?} is not configured", surface.label());
                return Ok(SurfaceOutput {
                    status: SurfaceGetCurrentTextureStatus::Error,
                    texture: None,
                });
            }
        };

        if presentation.device.is_lost() {
            return Ok(SurfaceOutput {
                status: SurfaceGetCurrentTextureStatus::Lost,
                texture: None,
            });
        }

        let texture = match &presentation.acquired {
            Some(texture) => self.hub.textures.acquire(texture),
            None => {
                let config = &presentation.config;
                let desc = TextureDescriptor {
                    view_formats: config.view_formats.clone(),
                    ..TextureDescriptor::new_2d(
                        None,
                        pt::Extent3d {
                            width: config.width,
                            height: config.height,
                            depth_or_array_layers: 1,
                        },
                        config.format,
                        config.usage,
                    )
                };

                let (id, texture) = self
                    .hub
                    .textures
                    .register(Texture::new(&presentation.device, &desc, false, None));
                resource_log!(
                    "Surface::get_current_texture {surface_id:?} {:?} acquired {id:?}",
                    surface.source
                );
                presentation.acquired = Some(texture);
                id
            }
        };

        Ok(SurfaceOutput {
            status: SurfaceGetCurrentTextureStatus::SuccessOptimal,
            texture: Some(texture),
        })
    }

    /// Present the acquired texture, which is destroyed.
    pub fn surface_present(&self, surface_id: id::SurfaceId) -> Result<(), SurfaceError> {
        profiling::scope!("Surface::present");
        api_log!("Surface::present {surface_id:?}");

        let surface = self.hub.surfaces.get(surface_id)?;
        let mut presentation = surface.presentation.lock();

        let presentation = presentation.as_mut().ok_or(SurfaceError::NotConfigured)?;

        if presentation.device.is_lost() {
            return Err(SurfaceError::DeviceLost);
        }

        let texture = presentation
            .acquired
            .take()
            .ok_or(SurfaceError::NothingToPresent)?;
        texture.destroy();
        Ok(())
    }

    pub fn surface_unconfigure(&self, surface_id: id::SurfaceId) -> Result<(), InvalidId> {
        api_log!("Surface::unconfigure {surface_id:?}");
        self.hub.surfaces.get(surface_id)?.unconfigure();
        Ok(())
    }

    pub fn surface_capabilities_free_members(&self, value: SurfaceCapabilities) {
        drop(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> SurfaceCapabilities {
        SurfaceCapabilities {
            usages: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            formats: vec![TextureFormat::Bgra8Unorm],
            present_modes: vec![PresentMode::Fifo],
            alpha_modes: vec![CompositeAlphaMode::Opaque],
        }
    }

    fn config(width: u32, height: u32) -> SurfaceConfiguration {
        SurfaceConfiguration::new(id::DeviceId::zip(0, 1), TextureFormat::Bgra8Unorm, width, height)
    }

    #[test]
    fn configuration_must_have_area() {
        assert_eq!(
            validate_surface_configuration(&config(0, 600), &caps(), 8192),
            Err(ConfigureSurfaceError::ZeroArea)
        );
        assert!(matches!(
            validate_surface_configuration(&config(16384, 600), &caps(), 8192),
            Err(ConfigureSurfaceError::TooLarge { .. })
        ));
        assert_eq!(validate_surface_configuration(&config(800, 600), &caps(), 8192), Ok(()));
    }

    #[test]
    fn configuration_follows_capabilities() {
        let mut srgb_view = config(800, 600);
        srgb_view.view_formats.push(TextureFormat::Bgra8UnormSrgb);
        assert_eq!(validate_surface_configuration(&srgb_view, &caps(), 8192), Ok(()));

        let mut mailbox = config(800, 600);
        mailbox.present_mode = PresentMode::Mailbox;
        assert!(matches!(
            validate_surface_configuration(&mailbox, &caps(), 8192),
            Err(ConfigureSurfaceError::UnsupportedPresentMode { .. })
        ));

        let mut storage = config(800, 600);
        storage.usage |= TextureUsages::STORAGE_BINDING;
        assert!(matches!(
            validate_surface_configuration(&storage, &caps(), 8192),
            Err(ConfigureSurfaceError::UnsupportedUsage { .. })
        ));
    }
}
