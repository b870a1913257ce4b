//! Device selection for training and inference.

use candle_core::Device;
use tracing::info;

/// Returns the best available device.
///
/// Automatically detects and uses GPU (Metal on macOS, CUDA on Linux/Windows)
/// if available, falling back to CPU.
#[must_use]
pub fn get_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal device");
            return device;
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA device");
            return device;
        }
    }

    info!("Using CPU");
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_device_without_gpu_features_is_cpu() {
        #[cfg(not(any(feature = "metal", feature = "cuda")))]
        assert!(get_device().is_cpu());
        #[cfg(any(feature = "metal", feature = "cuda"))]
        let _device = get_device();
    }
}
