use serde::{Deserialize, Serialize};

use crate::{GanErr, Result};

/// Construction parameters shared by the generator and the discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct NetworkConfig {
    /// Image channels, the generator's output and the discriminator's input.
    pub channels: usize,
    /// Width of the generator's latent noise vector. Ignored by the discriminator.
    pub latent_dim: usize,
    /// Final spatial resolution, a power of two `>= 4`.
    pub target_size: usize,
    /// Seed for the parameter initialization of every stage, OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channels: 3,
            latent_dim: 512,
            target_size: 256,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Parses a config from its JSON representation and validates it.
    ///
    /// # Arguments
    /// * `json` - The raw JSON text.
    ///
    /// # Returns
    /// The parsed config or an error if it's malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the config can build a network.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(GanErr::InvalidConfig("channels must be greater than 0"));
        }

        if self.latent_dim == 0 {
            return Err(GanErr::InvalidConfig("latent_dim must be greater than 0"));
        }

        total_stages(self.target_size)?;
        Ok(())
    }

    /// The amount of stages a network built with this config grows through.
    pub fn total_stages(&self) -> Result<usize> {
        total_stages(self.target_size)
    }
}

/// Computes `log2(target_size / 4) + 1`.
///
/// # Returns
/// The amount of stages or an error if `target_size` is not a power of two `>= 4`.
pub fn total_stages(target_size: usize) -> Result<usize> {
    if target_size < 4 || !target_size.is_power_of_two() {
        return Err(GanErr::InvalidTargetSize(target_size));
    }

    Ok((target_size / 4).trailing_zeros() as usize + 1)
}

/// The channel width schedule, `min(floor(8192 / 2^stage), 512)`.
///
/// Takes a signed stage since the discriminator indexes it as `nf(8 - stage)`, which goes
/// negative for target sizes above 512.
pub fn nf(stage: i32) -> usize {
    (8192. / 2f64.powi(stage)).floor().min(512.) as usize
}
