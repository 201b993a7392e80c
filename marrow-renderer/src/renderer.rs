use std::sync::Arc;

use anyhow::Result;

/// Headless GPU context. Windowing and surface management live with the
/// caller; everything in this crate only needs the device/queue pair.
pub struct Renderer {
    pub adapter_info: wgpu::AdapterInfo,
    pub device: Arc<wgpu::Device>,
    pub queue: wgpu::Queue,
}

impl Renderer {
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Renderer device"),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            adapter_info,
            device: Arc::new(device),
            queue,
        })
    }
}
