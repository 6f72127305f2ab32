use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Result};

/// Pick a compute device.
///
/// `None` runs on the CPU. `Some(ordinal)` asks for an accelerator and falls back to the
/// CPU, with a log line, when neither CUDA nor Metal is usable.
pub fn device(gpu: Option<usize>) -> Result<Device> {
    let Some(ordinal) = gpu else {
        return Ok(Device::Cpu);
    };
    if cuda_is_available() {
        match Device::new_cuda(ordinal) {
            Ok(device) => return Ok(device),
            Err(err) => log::warn!("CUDA device {ordinal} unavailable ({err}), trying others"),
        }
    }
    if metal_is_available() {
        match Device::new_metal(ordinal) {
            Ok(device) => return Ok(device),
            Err(err) => log::warn!("Metal device {ordinal} unavailable ({err})"),
        }
    }
    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    {
        log::info!("Running on CPU, to run on GPU(metal), build with `--features metal`");
    }
    #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
    {
        log::info!("Running on CPU, to run on GPU, build with `--features cuda`");
    }
    Ok(Device::Cpu)
}
